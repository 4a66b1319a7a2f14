//! Terminal sink used for every piece of user-visible output.
//!
//! The engine never prints directly. Each operation receives a [`Terminal`]
//! and routes progress dots, child-process output and messages through it.

pub mod progress;
pub mod table;

use std::io::Write;
use std::sync::Mutex;

pub use progress::ProgressLine;
pub use table::{format_table, TableOptions};

/// Output sink supplied by the caller of an operation.
pub trait Terminal: Send + Sync {
    /// Appends text to normal output without a newline.
    fn write(&self, text: &str);

    /// Appends text to the error channel.
    fn write_error(&self, text: &str);

    /// Writes a line of normal output.
    fn log(&self, text: &str);
}

// =============================================================================
// Console
// =============================================================================

/// Terminal backed by the process stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTerminal;

impl Terminal for ConsoleTerminal {
    fn write(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn write_error(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
        let _ = err.flush();
    }

    fn log(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
    }
}

// =============================================================================
// Null
// =============================================================================

/// Terminal that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTerminal;

impl Terminal for NullTerminal {
    fn write(&self, _text: &str) {}

    fn write_error(&self, _text: &str) {}

    fn log(&self, _text: &str) {}
}

// =============================================================================
// Memory
// =============================================================================

/// Terminal that captures output in memory.
///
/// `write` and `log` share one buffer so their interleaving is preserved;
/// `write_error` goes to a separate buffer.
#[derive(Debug, Default)]
pub struct MemoryTerminal {
    output: Mutex<String>,
    errors: Mutex<String>,
}

impl MemoryTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written through `write` and `log`.
    pub fn output(&self) -> String {
        self.output
            .lock()
            .map(|out| out.clone())
            .unwrap_or_default()
    }

    /// Everything written through `write_error`.
    pub fn errors(&self) -> String {
        self.errors
            .lock()
            .map(|err| err.clone())
            .unwrap_or_default()
    }
}

impl Terminal for MemoryTerminal {
    fn write(&self, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            out.push_str(text);
        }
    }

    fn write_error(&self, text: &str) {
        if let Ok(mut err) = self.errors.lock() {
            err.push_str(text);
        }
    }

    fn log(&self, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            out.push_str(text);
            out.push('\n');
        }
    }
}
