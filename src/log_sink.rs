//! The logging sink a host plugs into a transfer: a thread-safe, append-only
//! line sink distinct from the ambient `log` crate events the core also
//! emits at the same points (see `SPEC_FULL.md` §4.8). The core never reads
//! the sink back; it is a write-only notification channel for a UI or log
//! panel.

use std::sync::{Arc, Mutex};

/// A thread-safe sink a transfer appends human-readable lines to.
pub trait LogSink: Send + Sync {
    /// Appends one line. Implementations must not block indefinitely.
    fn append(&self, line: &str);
}

/// A [`LogSink`] that forwards every line to the `log` crate at `info`
/// level, for hosts that want diagnostics without wiring up a UI panel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn append(&self, line: &str) {
        log::info!("{line}");
    }
}

/// A [`LogSink`] that collects every line in memory, for tests that assert
/// on emitted diagnostics.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl VecSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every line appended so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("log sink mutex poisoned").clone()
    }
}

impl LogSink for VecSink {
    fn append(&self, line: &str) {
        self.lines
            .lock()
            .expect("log sink mutex poisoned")
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_lines_in_order() {
        let sink = VecSink::new();
        sink.append("first");
        sink.append("second");
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }
}
