//! Append-only log transcript collected from milestone workers.

use chrono::{DateTime, Utc};

/// Worker log lines accumulated over one pipeline run, rendered into the
/// final report. Lives inside the dispatcher-confined call context, so no
/// locking of its own.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message, stamped with the given wall-clock time.
    pub fn append(&mut self, at: DateTime<Utc>, message: &str) {
        self.lines
            .push(format!("[{}] {}", at.format("%Y-%m-%dT%H:%M:%SZ"), message));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The full transcript, one line per message, in append order.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}
