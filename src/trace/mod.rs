//! Execution tracing
//!
//! - [`serialize`]: bounded projection of runtime values
//! - [`recorder`]: ordered step records under a step budget
//! - [`tracer`]: compiles, instruments and classifies one run
//! - [`outcome`]: the trace entries and [`outcome::RunOutcome`] sent across the sandbox boundary

pub mod outcome;
pub mod recorder;
pub mod serialize;
pub mod tracer;

pub use outcome::{RunOutcome, RunStatus, TraceEntry, TraceStep};
pub use serialize::{serialize_value, SerializedValue};
pub use tracer::{TraceRun, Tracer};
