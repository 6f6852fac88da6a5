//! Cooperative cancellation shared by the sender and receiver state
//! machines: a handle either side can `stop()` from another thread, and
//! which `work()` observes once per outer loop iteration. Not true
//! preemption — a blocking socket call or pacing sleep in progress runs to
//! completion before the flag is checked again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared cancellation flag. Clone to hand a stop button to another
/// thread while a state machine's `work()` runs on its own.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Creates a handle in the running state.
    pub fn new() -> Self {
        StopHandle {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the state machine should keep running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
