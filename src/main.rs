// pytrace: line-by-line Python execution tracer with terminal replay

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::level_filters::LevelFilter;

use pytrace::config::{Config, ConfigError, Overrides};
use pytrace::sandbox::{ExecutionResult, SandboxBridge};
use pytrace::ui::App;

/// Trace a Python program line by line and replay it.
#[derive(Parser)]
#[command(name = "pytrace", version, about)]
struct Cli {
    /// Python source file to trace.
    file: PathBuf,

    /// Print the execution result as JSON instead of opening the player.
    #[arg(long)]
    json: bool,

    /// Wall-clock bound on the run in milliseconds.
    #[arg(long, value_name = "N")]
    timeout_ms: Option<u64>,

    /// Maximum number of recorded steps.
    #[arg(long, value_name = "N")]
    step_budget: Option<usize>,

    /// Log more (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Environment first, then flags
    fn config(&self) -> Result<Config, ConfigError> {
        Config::from_env()?.with_overrides(Overrides {
            timeout_ms: self.timeout_ms,
            step_budget: self.step_budget,
        })
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config()?;
    let source = fs::read_to_string(&cli.file)
        .map_err(|err| format!("cannot read '{}': {}", cli.file.display(), err))?;

    tracing::info!(file = %cli.file.display(), "tracing program");
    let result = trace_program(config, &source)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    run_player(result, source)?;
    Ok(())
}

/// Run one program through the sandbox; the bridge is gone once this returns
fn trace_program(config: Config, source: &str) -> Result<ExecutionResult, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let bridge = SandboxBridge::start(config)?;
        bridge.execute(source).await
    })?;
    Ok(result)
}

fn run_player(result: ExecutionResult, source: String) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(result, source);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
