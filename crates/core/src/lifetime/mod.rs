//! Worker liveness watchdog.
//!
//! A periodic loop, independent of the call dispatcher, that inspects the
//! registry for milestones stuck in `Running` and terminates their backing
//! OS process. The kill capability is injected as a [`ProcessTerminator`]
//! so tests can substitute a recording fake.

mod terminator;
mod watchdog;

pub use terminator::{
    identity_token, OsProcessTerminator, ProcessHandle, ProcessTerminator, TerminateError,
    TerminateOutcome,
};
pub use watchdog::LifetimeWatchdog;
