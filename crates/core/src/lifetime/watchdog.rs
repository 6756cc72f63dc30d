//! Periodic liveness check for running milestones.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::LifetimeConfig;
use crate::dispatch::SharedCallContext;
use crate::metrics;
use crate::registry::{MilestoneCondition, MilestoneKind, MilestoneRegistry};

use super::terminator::{ProcessHandle, ProcessTerminator, TerminateOutcome};

/// Kills workers that stop making progress.
///
/// Two clocks are watched per running milestone: dwell time (since the
/// last reported update) catches a hung worker that stopped heartbeating,
/// and run time (since start) caps total wall time for a worker that is
/// alive but pathologically slow.
///
/// The loop runs independently of the call dispatcher; each tick takes
/// the shared context mutex so its read-decide-write is atomic against
/// the dispatch runner. A completion racing a kill is resolved by
/// whoever locks first, and the loser's stale decision has no effect
/// because the condition is re-checked under the lock.
pub struct LifetimeWatchdog {
    config: LifetimeConfig,
    context: SharedCallContext,
    terminator: Arc<dyn ProcessTerminator>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl LifetimeWatchdog {
    pub fn new(
        config: LifetimeConfig,
        context: SharedCallContext,
        terminator: Arc<dyn ProcessTerminator>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            context,
            terminator,
            shutdown_rx,
        }
    }

    /// Run the poll loop. Spawn as a background task with
    /// `tokio::spawn(watchdog.run())`.
    pub async fn run(mut self) {
        info!(
            "Lifetime watchdog started (dwell {}s, run {}s, every {}s)",
            self.config.max_update_dwell_secs,
            self.config.max_run_secs,
            self.config.poll_interval_secs
        );

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Lifetime watchdog received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let now = Utc::now().timestamp();
                    let mut context = self.context.lock().await;
                    Self::evaluate_tick(
                        &mut context.registry,
                        &self.config,
                        self.terminator.as_ref(),
                        now,
                    );
                }
            }
        }

        info!("Lifetime watchdog stopped");
    }

    /// One poll tick over the whole registry. Must run with the registry
    /// exclusively held; `now` is injected so tests drive ticks directly.
    pub fn evaluate_tick(
        registry: &mut MilestoneRegistry,
        config: &LifetimeConfig,
        terminator: &dyn ProcessTerminator,
        now: i64,
    ) {
        for kind in MilestoneKind::ALL {
            let record = registry.get(kind);

            // Only a running milestone backed by a live process is a
            // candidate; an already-Failed record makes a later tick a
            // no-op.
            if record.condition != MilestoneCondition::Running
                || record.last_update == 0
                || record.start_time == 0
                || record.process_id == 0
            {
                continue;
            }

            let dwell = now - record.last_update;
            let run = now - record.start_time;
            if dwell <= config.max_update_dwell_secs as i64 && run <= config.max_run_secs as i64 {
                continue;
            }
            let reason = if dwell > config.max_update_dwell_secs as i64 {
                "dwell"
            } else {
                "run"
            };

            let target = ProcessHandle {
                pid: record.process_id,
                token: record.process_token,
            };
            match terminator.terminate(&target) {
                Ok(TerminateOutcome::Killed) => {
                    warn!(
                        "Milestone {} was forcefully terminated (pid {}, {} time exceeded)",
                        kind, target.pid, reason
                    );
                }
                Ok(TerminateOutcome::AlreadyExited) => {
                    warn!(
                        "Milestone {} worker already exited (pid {}), marking failed",
                        kind, target.pid
                    );
                }
                Err(e) => {
                    warn!("Could not terminate milestone {} worker: {}", kind, e);
                }
            }

            // Failed in every branch, so a stuck record can never stay
            // Running forever.
            registry.get_mut(kind).condition = MilestoneCondition::Failed;
            metrics::WATCHDOG_TERMINATIONS
                .with_label_values(&[kind.wire_name(), reason])
                .inc();
        }
    }
}
