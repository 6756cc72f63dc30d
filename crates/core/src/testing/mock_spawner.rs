//! Mock worker spawner for driver tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::config::WorkerCommand;
use crate::lifetime::ProcessHandle;
use crate::process::{LaunchError, WorkerHandle, WorkerSpawner};
use crate::registry::MilestoneKind;

type WorkerBody = Arc<dyn Fn(MilestoneKind) -> BoxFuture<'static, ()> + Send + Sync>;

/// Mock implementation of the WorkerSpawner trait.
///
/// Provides controllable behavior for testing:
/// - Track spawned kinds for assertions
/// - Simulate spawn failure per kind
/// - Run an async body standing in for the worker's lifetime
/// - Control the exit status
pub struct MockSpawner {
    spawns: Arc<RwLock<Vec<MilestoneKind>>>,
    fail_kinds: Arc<RwLock<HashSet<MilestoneKind>>>,
    exit_success: Arc<RwLock<bool>>,
    body: Arc<RwLock<Option<WorkerBody>>>,
    next_pid: AtomicU32,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpawner {
    pub fn new() -> Self {
        Self {
            spawns: Arc::new(RwLock::new(Vec::new())),
            fail_kinds: Arc::new(RwLock::new(HashSet::new())),
            exit_success: Arc::new(RwLock::new(true)),
            body: Arc::new(RwLock::new(None)),
            next_pid: AtomicU32::new(1000),
        }
    }

    /// Kinds spawned so far, in order.
    pub async fn recorded_spawns(&self) -> Vec<MilestoneKind> {
        self.spawns.read().await.clone()
    }

    /// Make spawning the given kind fail.
    pub async fn fail_spawn_for(&self, kind: MilestoneKind) {
        self.fail_kinds.write().await.insert(kind);
    }

    /// Set the exit status of every mock worker.
    pub async fn set_exit_success(&self, success: bool) {
        *self.exit_success.write().await = success;
    }

    /// Install an async body that runs while the mock worker is "alive"
    /// (awaited inside `wait`), standing in for the worker's own RPC
    /// traffic.
    pub async fn set_on_spawn<F>(&self, body: F)
    where
        F: Fn(MilestoneKind) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        *self.body.write().await = Some(Arc::new(body));
    }
}

#[async_trait]
impl WorkerSpawner for MockSpawner {
    async fn spawn(
        &self,
        kind: MilestoneKind,
        _command: &WorkerCommand,
    ) -> Result<Box<dyn WorkerHandle>, LaunchError> {
        if self.fail_kinds.read().await.contains(&kind) {
            return Err(LaunchError::Spawn {
                kind: kind.wire_name(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock spawn failure"),
            });
        }

        self.spawns.write().await.push(kind);
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockWorkerHandle {
            kind,
            process: ProcessHandle {
                pid,
                token: u64::from(pid) * 10,
            },
            body: self.body.read().await.clone(),
            exit_success: *self.exit_success.read().await,
        }))
    }
}

struct MockWorkerHandle {
    kind: MilestoneKind,
    process: ProcessHandle,
    body: Option<WorkerBody>,
    exit_success: bool,
}

#[async_trait]
impl WorkerHandle for MockWorkerHandle {
    fn process(&self) -> ProcessHandle {
        self.process
    }

    async fn wait(&mut self) -> Result<bool, LaunchError> {
        if let Some(body) = self.body.take() {
            body(self.kind).await;
        }
        Ok(self.exit_success)
    }
}
