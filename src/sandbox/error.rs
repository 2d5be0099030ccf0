//! Sandbox bridge error types
//!
//! [`BridgeError`] covers transport failures only. A program that fails to
//! parse or raises is a successful execution whose result says so.

use std::time::Duration;
use thiserror::Error;

/// A frame could not be encoded or decoded
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The sandbox could not load the tracer
    #[error("sandbox failed to initialize: {0}")]
    InitFailed(String),

    /// No result arrived within the configured bound
    #[error("execution timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The sandbox reported a failure instead of a trace
    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("malformed response from sandbox: {0}")]
    MalformedResponse(String),

    /// The sandbox worker is gone
    #[error("sandbox disconnected")]
    Disconnected,

    #[error("failed to start sandbox worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
