//! Single-line, in-place progress rendering.

use super::Terminal;

const DONE_MARK: &str = " ✓";

/// In-place progress line for one sequence of steps.
///
/// Remembers the length of the last rendered line so a shorter line can erase
/// the stale tail. Each operation owns its own `ProgressLine`, so concurrent
/// operations on different terminals never disturb each other.
#[derive(Debug, Default)]
pub struct ProgressLine {
    last_len: usize,
}

impl ProgressLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites the current line with `text`.
    pub fn line(&mut self, terminal: &dyn Terminal, text: &str) {
        terminal.write(&format!("\r{text}"));
        let len = text.chars().count();
        if self.last_len > len {
            let extra = self.last_len - len;
            terminal.write(&format!("{}{}", " ".repeat(extra), "\u{8}".repeat(extra)));
        }
        self.last_len = len;
    }

    /// Shows `label...` as the current step.
    pub fn progress(&mut self, terminal: &dyn Terminal, label: &str) {
        self.line(terminal, &format!("{label}..."));
    }

    /// Marks the sequence finished and resets the baseline.
    ///
    /// Call this before any unrelated output, otherwise the next line is
    /// padded against a stale length.
    pub fn done(&mut self, terminal: &dyn Terminal) {
        terminal.log(DONE_MARK);
        self.last_len = 0;
    }
}
