//! # Introduction
//!
//! pytrace runs a Python-subset program under a line-level tracer, recording
//! the serialized locals of every `line`, `return` and `exception` event of
//! the submitted source. The trace is then replayed forward and backward
//! through a terminal UI built with [ratatui](https://docs.rs/ratatui), or
//! printed as JSON.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter + Hook → Trace → Bridge → TUI
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST tagged with its
//!    code origin (`<submitted>` or `<prelude>`).
//! 2. [`interpreter`]: walks the AST and reports events of subscribed frames
//!    to an [`interpreter::hook::Hook`].
//! 3. [`memory`]: runtime values and call-stack frames.
//! 4. [`trace`]: bounded value serialization, the step recorder under a step
//!    budget, and the tracer that classifies how a run ended.
//! 5. [`sandbox`]: a worker thread owning the tracer, reached over JSON
//!    frames by an async bridge with correlation ids and a timeout.
//! 6. [`ui`]: ratatui-based replay; not part of the stable library API.
//!
//! ## Supported Python subset
//!
//! Literals, displays and comprehensions, the usual operators, `def`,
//! `lambda`, `class` with single inheritance, `try/except/finally`,
//! `global`/`nonlocal`, and `import math`. Built-ins cover what learners
//! commonly reach for: `print`, `len`, `range`, `sorted`, `enumerate`,
//! `zip`, `map`, `filter` and friends.

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod sandbox;
pub mod trace;
pub mod ui;
