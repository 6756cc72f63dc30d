//! Worker spawning seam.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::WorkerCommand;
use crate::lifetime::{identity_token, ProcessHandle};
use crate::registry::MilestoneKind;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {kind} worker: {source}")]
    Spawn {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {kind} worker: {source}")]
    Wait {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A spawned worker the driver can wait on.
#[async_trait]
pub trait WorkerHandle: Send {
    /// Process identity captured at spawn.
    fn process(&self) -> ProcessHandle;

    /// Wait for exit; true means a zero exit status.
    async fn wait(&mut self) -> Result<bool, LaunchError>;
}

/// Spawns milestone worker processes.
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(
        &self,
        kind: MilestoneKind,
        command: &WorkerCommand,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError>;
}

/// Real spawner backed by `tokio::process`.
#[derive(Debug, Default)]
pub struct TokioWorkerSpawner;

impl TokioWorkerSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkerSpawner for TokioWorkerSpawner {
    async fn spawn(
        &self,
        kind: MilestoneKind,
        command: &WorkerCommand,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError> {
        let child = Command::new(&command.command)
            .args(&command.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                kind: kind.wire_name(),
                source,
            })?;

        let pid = child.id().unwrap_or(0);
        // Capture the start-time identity now, while the pid is known to
        // be ours; the watchdog verifies it before any kill.
        let token = identity_token(pid).unwrap_or(0);
        debug!("Spawned {} worker: pid {} token {}", kind, pid, token);

        Ok(Box::new(TokioWorkerHandle {
            kind,
            process: ProcessHandle { pid, token },
            child,
        }))
    }
}

struct TokioWorkerHandle {
    kind: MilestoneKind,
    process: ProcessHandle,
    child: Child,
}

#[async_trait]
impl WorkerHandle for TokioWorkerHandle {
    fn process(&self) -> ProcessHandle {
        self.process
    }

    async fn wait(&mut self) -> Result<bool, LaunchError> {
        let status = self.child.wait().await.map_err(|source| LaunchError::Wait {
            kind: self.kind.wire_name(),
            source,
        })?;
        Ok(status.success())
    }
}
