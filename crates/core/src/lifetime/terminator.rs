//! Process termination boundary.

use thiserror::Error;

/// Identity of a worker process captured at spawn time.
///
/// The token is the OS start-time of the process (`/proc/<pid>/stat`
/// field 22 on Linux). A bare pid can be reused by the OS for an
/// unrelated process; the token lets the terminator refuse to signal a
/// pid whose identity no longer matches. Zero means no token was
/// available at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// A kill signal was delivered.
    Killed,
    /// The process was already gone, or the pid now belongs to a
    /// different process. Treated as already handled.
    AlreadyExited,
}

#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// The watchdog's only write access to the OS: terminate by identity.
pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, target: &ProcessHandle) -> Result<TerminateOutcome, TerminateError>;
}

/// Read the start-time identity token for a live process.
///
/// Returns `None` when the process does not exist. On non-Linux unix the
/// token is not available and a live process yields `Some(0)`.
#[cfg(target_os = "linux")]
pub fn identity_token(pid: u32) -> Option<u64> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // comm (field 2) may contain spaces; start-time is the 22nd field
    // overall, the 20th after the closing paren.
    let after_comm = stat.rsplit_once(')')?.1;
    after_comm.split_whitespace().nth(19)?.parse().ok()
}

#[cfg(all(unix, not(target_os = "linux")))]
pub fn identity_token(pid: u32) -> Option<u64> {
    let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0;
    alive.then_some(0)
}

/// Terminator backed by `SIGKILL`.
#[derive(Debug, Default)]
pub struct OsProcessTerminator;

impl OsProcessTerminator {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTerminator for OsProcessTerminator {
    fn terminate(&self, target: &ProcessHandle) -> Result<TerminateOutcome, TerminateError> {
        match identity_token(target.pid) {
            None => return Ok(TerminateOutcome::AlreadyExited),
            Some(current) => {
                // A token mismatch means the pid was recycled for an
                // unrelated process; the worker itself is gone.
                if target.token != 0 && current != 0 && current != target.token {
                    return Ok(TerminateOutcome::AlreadyExited);
                }
            }
        }

        let rc = unsafe { libc::kill(target.pid as libc::pid_t, libc::SIGKILL) };
        if rc == 0 {
            return Ok(TerminateOutcome::Killed);
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(TerminateOutcome::AlreadyExited)
        } else {
            Err(TerminateError::Signal {
                pid: target.pid,
                source: err,
            })
        }
    }
}
