//! Captured stdout/stderr of one run
//!
//! The sandbox has no real terminal: `print` appends to an in-memory stream
//! and the whole buffer is returned with the run's result. Each stream is
//! capped so a print loop cannot exhaust memory before the step budget ends it.

use super::constants::{CONSOLE_TRUNCATED_MARKER, MAX_CONSOLE_BYTES};

/// One capped output stream
#[derive(Debug, Clone, Default)]
pub struct OutputStream {
    text: String,
    truncated: bool,
}

impl OutputStream {
    pub fn write(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let room = MAX_CONSOLE_BYTES.saturating_sub(self.text.len());
        if text.len() <= room {
            self.text.push_str(text);
            return;
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&text[..cut]);
        self.text.push_str(CONSOLE_TRUNCATED_MARKER);
        self.truncated = true;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// stdout and stderr of the traced program
#[derive(Debug, Clone, Default)]
pub struct Console {
    pub stdout: OutputStream,
    pub stderr: OutputStream,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print without an implicit newline
    pub fn print(&mut self, text: &str) {
        self.stdout.write(text);
    }

    pub fn into_streams(self) -> (String, String) {
        (self.stdout.text, self.stderr.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_accumulates_lines() {
        let mut console = Console::new();
        console.print("a");
        console.print("b\n");
        console.print("c\n");
        assert_eq!(console.into_streams(), ("ab\nc\n".to_string(), String::new()));
    }

    #[test]
    fn test_stream_is_capped_once() {
        let mut stream = OutputStream::default();
        let chunk = "x".repeat(MAX_CONSOLE_BYTES / 2 + 1);
        stream.write(&chunk);
        stream.write(&chunk);
        stream.write("more");
        assert!(stream.is_truncated());
        assert!(stream.as_str().ends_with(CONSOLE_TRUNCATED_MARKER));
        assert_eq!(
            stream.as_str().len(),
            MAX_CONSOLE_BYTES + CONSOLE_TRUNCATED_MARKER.len()
        );
    }
}
