// Constants for the Python interpreter

/// Deepest call stack before `RecursionError`
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Longest list/str/tuple a single operation may materialize before `MemoryError`
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 1_000_000;

/// Console output kept per stream; later writes are dropped
pub const MAX_CONSOLE_BYTES: usize = 256 * 1024;

/// Appended once when a console stream hits its cap
pub const CONSOLE_TRUNCATED_MARKER: &str = "\n[output truncated]\n";

/// Statements executed between two polls of the abort signal
pub const ABORT_POLL_INTERVAL: u32 = 64;
