//! Sandbox boundary
//!
//! Submitted programs run on a dedicated worker thread that owns the
//! [`crate::trace::Tracer`]. The async [`bridge::SandboxBridge`] talks to it
//! only through JSON frames defined in [`protocol`], correlating results by
//! request id and enforcing a wall-clock timeout.

pub mod bridge;
pub mod error;
pub mod protocol;
pub mod worker;

pub use bridge::{ExecutionResult, SandboxBridge};
pub use error::BridgeError;
