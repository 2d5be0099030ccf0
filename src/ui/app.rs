//! Main TUI application state and logic

use super::panes::{
    render_console_pane, render_locals_pane, render_source_pane, render_status_bar,
    ConsoleRenderData, SourceRenderData, SourceScrollState, StatusRenderData,
};
use super::player::TracePlayer;
use crate::sandbox::ExecutionResult;
use crate::trace::outcome::{RunStatus, TraceStep};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Key repeat guard for the play toggle
const SPACE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Locals,
    Console,
}

impl FocusedPane {
    /// Move focus clockwise: source -> console -> locals
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Console,
            FocusedPane::Console => FocusedPane::Locals,
            FocusedPane::Locals => FocusedPane::Source,
        }
    }
}

pub struct App {
    pub source_code: String,
    pub result: ExecutionResult,
    /// Steps of the trace without the trailing notice
    steps: Vec<TraceStep>,
    pub player: TracePlayer,
    pub focused_pane: FocusedPane,
    pub source_scroll: SourceScrollState,
    pub locals_scroll: usize,
    pub console_scroll: usize,
    pub should_quit: bool,
    pub status_message: String,
    last_space_press: Option<Instant>,
}

impl App {
    pub fn new(result: ExecutionResult, source_code: String) -> Self {
        let steps: Vec<TraceStep> = result.outcome.steps().cloned().collect();
        let status_message = match &result.outcome.failure {
            Some(failure) => failure.summary(),
            None => format!("{} steps recorded", steps.len()),
        };
        App {
            source_code,
            player: TracePlayer::new(steps.len()),
            steps,
            result,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            locals_scroll: 0,
            console_scroll: 0,
            should_quit: false,
            status_message,
            last_space_press: None,
        }
    }

    pub fn current_step(&self) -> Option<&TraceStep> {
        self.steps.get(self.player.current())
    }

    /// The line a failed run is blamed on, if it is in the source
    pub fn error_line(&self) -> Option<usize> {
        match self.result.outcome.status {
            RunStatus::RuntimeError | RunStatus::SyntaxError => {}
            _ => return None,
        }
        let line = self.result.outcome.failure.as_ref()?.line;
        usize::try_from(line).ok().filter(|line| *line > 0)
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.player.tick(Instant::now()) {
                self.status_message = if self.player.is_playing() {
                    "Playing...".to_string()
                } else {
                    "Playback complete".to_string()
                };
            }

            // Poll with a timeout so playback keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key, Instant::now());
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Console (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        let current_line = self.current_step().map_or(0, |step| step.line);
        let error_line = self.error_line();
        render_source_pane(
            frame,
            left_rows[0],
            SourceRenderData {
                source_code: &self.source_code,
                current_line,
                error_line,
            },
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        render_console_pane(
            frame,
            left_rows[1],
            ConsoleRenderData {
                stdout: &self.result.stdout,
                stderr: &self.result.stderr,
                notice: self.result.outcome.notice(),
            },
            self.focused_pane == FocusedPane::Console,
            &mut self.console_scroll,
        );

        let step = self.steps.get(self.player.current());
        render_locals_pane(
            frame,
            columns[1],
            step,
            self.focused_pane == FocusedPane::Locals,
            &mut self.locals_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                player: &self.player,
                status: self.result.outcome.status,
            },
        );
    }

    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times
            KeyCode::Char(c @ '1'..='9') => {
                self.player.pause();
                let n = c.to_digit(10).unwrap_or(1);
                let stepped = (0..n).take_while(|_| self.player.step_forward()).count();
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.locals_scroll = 0;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.player.pause();
                self.status_message = if self.player.step_backward() {
                    "Stepped backward".to_string()
                } else {
                    "Already at the first step".to_string()
                };
                self.locals_scroll = 0;
            }
            KeyCode::Right => {
                self.player.pause();
                self.status_message = if self.player.step_forward() {
                    "Stepped forward".to_string()
                } else {
                    "Already at the last step".to_string()
                };
                self.locals_scroll = 0;
            }
            KeyCode::Up => match self.focused_pane {
                // Scrolling up makes the current line move down visually
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Locals => self.locals_scroll = self.locals_scroll.saturating_sub(1),
                FocusedPane::Console => self.console_scroll = self.console_scroll.saturating_sub(1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Locals => self.locals_scroll = self.locals_scroll.saturating_add(1),
                FocusedPane::Console => self.console_scroll = self.console_scroll.saturating_add(1),
            },
            KeyCode::Char(' ') => {
                let debounced = self
                    .last_space_press
                    .is_some_and(|last| now.duration_since(last) < SPACE_DEBOUNCE);
                if !debounced {
                    self.last_space_press = Some(now);
                    self.player.toggle_play(now);
                    self.status_message = if self.player.is_playing() {
                        "Playing...".to_string()
                    } else {
                        "Paused".to_string()
                    };
                }
            }
            KeyCode::Enter => {
                self.player.pause();
                self.player.jump_end();
                self.status_message = "Jumped to end".to_string();
            }
            KeyCode::Backspace => {
                self.player.pause();
                self.player.jump_start();
                self.status_message = "Jumped to start".to_string();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TracerLimits;
    use crate::trace::Tracer;
    use crossterm::event::KeyModifiers;

    fn app_for(source: &str) -> App {
        let run = Tracer::new(TracerLimits::default()).unwrap().run(source);
        let result = ExecutionResult {
            success: run.outcome.status != RunStatus::SyntaxError,
            outcome: run.outcome,
            stdout: run.stdout,
            stderr: run.stderr,
            execution_time: 0.0,
            error: None,
        };
        App::new(result, source.to_string())
    }

    fn press(app: &mut App, code: KeyCode, now: Instant) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), now);
    }

    #[test]
    fn test_keys_move_through_steps() {
        let mut app = app_for("a = 1\nb = 2\nc = 3\n");
        let now = Instant::now();
        assert_eq!(app.current_step().map(|s| s.line), Some(1));
        press(&mut app, KeyCode::Right, now);
        assert_eq!(app.current_step().map(|s| s.line), Some(2));
        press(&mut app, KeyCode::Enter, now);
        assert!(app.player.at_end());
        press(&mut app, KeyCode::Backspace, now);
        assert!(app.player.at_start());
        press(&mut app, KeyCode::Char('3'), now);
        assert_eq!(app.player.current(), 3);
        press(&mut app, KeyCode::Char('q'), now);
        assert!(app.should_quit);
    }

    #[test]
    fn test_space_toggles_play_with_debounce() {
        let mut app = app_for("a = 1\nb = 2\n");
        let now = Instant::now();
        press(&mut app, KeyCode::Char(' '), now);
        assert!(app.player.is_playing());
        // A repeat within the debounce window is ignored.
        press(&mut app, KeyCode::Char(' '), now + Duration::from_millis(50));
        assert!(app.player.is_playing());
        press(&mut app, KeyCode::Char(' '), now + Duration::from_millis(300));
        assert!(!app.player.is_playing());
    }

    #[test]
    fn test_error_line_of_failed_run() {
        let app = app_for("x = [1, 2]\nprint(x[5])\n");
        assert_eq!(app.error_line(), Some(2));
        assert_eq!(app.status_message, "IndexError: list index out of range");

        let app = app_for("x = 1\n");
        assert_eq!(app.error_line(), None);

        let app = app_for("def f(:\n");
        assert_eq!(app.error_line(), Some(1));
        assert!(app.current_step().is_none());
    }

    #[test]
    fn test_focus_cycles() {
        let mut app = app_for("pass\n");
        for expected in [FocusedPane::Console, FocusedPane::Locals, FocusedPane::Source] {
            press(&mut app, KeyCode::Tab, Instant::now());
            assert_eq!(app.focused_pane, expected);
        }
    }
}
