//! Terminal replay of a trace built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into four layers:
//!
//! - **[`player`]**: the scrubber model and cooperative play timer
//! - **[`app`]**: application state, keyboard event loop, pane focus
//! - **[`panes`]**: stateless render functions for each visible pane (source,
//!   locals, console, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with an
//! [`ExecutionResult`] and call [`App::run`] to start the event loop.
//!
//! [`ExecutionResult`]: crate::sandbox::ExecutionResult
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod player;
pub mod theme;

pub use app::App;
pub use player::TracePlayer;
