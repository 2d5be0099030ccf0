//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: submitted source with highlighting, current and failing line
//! - [`locals`]: function, event and serialized locals of the current step
//! - [`console`]: captured stdout and stderr plus the run's notice
//! - [`status`]: status bar with step position, outcome and keybindings
//! - `utils`: shared block, scrolling and value styling helpers
//!
//! Each pane exports a `render_*` function taking the frame, its area, the
//! data to show and its scroll state. Panes hold no state of their own.

mod utils;

pub mod console;
pub mod locals;
pub mod source;
pub mod status;

pub use console::{render_console_pane, ConsoleRenderData};
pub use locals::render_locals_pane;
pub use source::{render_source_pane, SourceRenderData, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
