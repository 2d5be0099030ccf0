//! Python interpreter execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: Interpreter state, frames, name resolution and hook dispatch
//! - [`hook`]: The instrumentation interface the tracer implements
//! - [`errors`]: Python exceptions and the internal control-flow signal
//! - [`prelude`]: Built-ins written in Python
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time.
//! Before each statement a `line` event is delivered to the [`hook::Hook`]
//! for frames it subscribed to; frame exits deliver `return`, and the first
//! arrival of an exception in a frame delivers `exception`.
//!
//! # Built-in Functions
//!
//! Most built-ins (`print`, `len`, `sorted`, ...) and the methods of the
//! built-in types are implemented natively in [`builtins`] and `methods`.
//! The few that call back into user code (`map`, `filter`) live in the prelude.

pub mod builtins;
mod calls;
pub mod console;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
mod format;
pub mod hook;
mod iteration;
mod methods;
mod ops;
pub mod prelude;
mod statements;
