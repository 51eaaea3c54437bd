//! Human-readable progress output
//!
//! Progress lines are for the operator watching the bootstrap. They are passed to an
//! explicit [`ProgressSink`] and never consulted for control decisions; diagnostics go
//! through `tracing` instead.
use std::io::Write;

use parking_lot::Mutex;

/// Receives status lines such as `Waiting for api-server...`
pub trait ProgressSink {
    /// Emit one line (without a trailing newline)
    fn line(&self, line: &str);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn line(&self, line: &str) {
        (**self).line(line)
    }
}

/// Writes progress lines to stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct Stdout;

impl ProgressSink for Stdout {
    fn line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // a closed stdout must not fail the bootstrap
        let _ = writeln!(out, "{line}");
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    /// All lines emitted so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ProgressSink for Recorder {
    fn line(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}
