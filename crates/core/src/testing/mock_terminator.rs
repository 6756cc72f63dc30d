//! Mock process terminator for watchdog tests.

use std::sync::Mutex;

use crate::lifetime::{ProcessHandle, ProcessTerminator, TerminateError, TerminateOutcome};

/// Records termination requests instead of signalling real processes.
///
/// # Example
///
/// ```rust,ignore
/// use milo_core::testing::MockTerminator;
///
/// let terminator = MockTerminator::new();
/// terminator.set_outcome(TerminateOutcome::AlreadyExited);
///
/// // ... run a watchdog tick ...
///
/// assert_eq!(terminator.recorded_calls().len(), 1);
/// ```
#[derive(Debug)]
pub struct MockTerminator {
    calls: Mutex<Vec<ProcessHandle>>,
    outcome: Mutex<TerminateOutcome>,
    fail_next: Mutex<bool>,
}

impl Default for MockTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTerminator {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcome: Mutex::new(TerminateOutcome::Killed),
            fail_next: Mutex::new(false),
        }
    }

    /// Every termination request seen so far, in order.
    pub fn recorded_calls(&self) -> Vec<ProcessHandle> {
        self.calls.lock().unwrap().clone()
    }

    /// Outcome returned by subsequent terminations.
    pub fn set_outcome(&self, outcome: TerminateOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Make the next termination fail with a signalling error.
    pub fn set_next_error(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

impl ProcessTerminator for MockTerminator {
    fn terminate(&self, target: &ProcessHandle) -> Result<TerminateOutcome, TerminateError> {
        self.calls.lock().unwrap().push(*target);

        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(TerminateError::Signal {
                pid: target.pid,
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock failure"),
            });
        }

        Ok(*self.outcome.lock().unwrap())
    }
}
