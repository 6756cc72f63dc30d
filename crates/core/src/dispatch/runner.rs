use std::panic::AssertUnwindSafe;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use crate::metrics;

use super::context::SharedCallContext;
use super::handle::CallDispatcher;
use super::unit::CallUnit;

/// The single consumer of the call queue.
///
/// Runs for the orchestrator's whole lifetime and executes every unit
/// synchronously, one at a time, under the shared context mutex. A unit
/// that panics is logged and skipped; the loop must survive any single
/// bad unit, because pipeline liveness depends on it.
pub struct CallRunner {
    rx: mpsc::Receiver<CallUnit>,
    context: SharedCallContext,
    shutdown_rx: broadcast::Receiver<()>,
}

impl CallRunner {
    pub fn new(
        rx: mpsc::Receiver<CallUnit>,
        context: SharedCallContext,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            rx,
            context,
            shutdown_rx,
        }
    }

    /// Run the consumer loop. Spawn as a background task with
    /// `tokio::spawn(runner.run())`.
    ///
    /// Shutdown is cooperative: the signal is observed at the loop
    /// boundary, never mid-unit. Units still queued at shutdown are
    /// dropped, which releases their waiters with an unavailable result.
    pub async fn run(mut self) {
        info!("Call runner started");

        loop {
            // Biased so a pending shutdown wins over further queued units.
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Call runner received shutdown signal");
                    break;
                }
                unit = self.rx.recv() => {
                    let Some(unit) = unit else {
                        info!("All dispatcher handles dropped, call runner stopping");
                        break;
                    };
                    self.execute_unit(unit).await;
                }
            }
        }

        info!("Call runner stopped");
    }

    async fn execute_unit(&self, unit: CallUnit) {
        let op = unit.op();
        let mut context = self.context.lock().await;

        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| unit.execute(&mut context)));

        match outcome {
            Ok(()) => {
                metrics::CALLS_DISPATCHED
                    .with_label_values(&[op, "ok"])
                    .inc();
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic".to_string());
                error!("Call unit {} panicked: {}", op, message);
                metrics::CALLS_DISPATCHED
                    .with_label_values(&[op, "panicked"])
                    .inc();
            }
        }
    }
}

/// Create a dispatcher/runner pair over the given shared context.
///
/// Returns:
/// - `CallDispatcher` - clone freely across RPC handler tasks
/// - `CallRunner` - spawn as a background task with `tokio::spawn(runner.run())`
pub fn create_call_dispatch(
    context: SharedCallContext,
    queue_depth: usize,
    shutdown_rx: broadcast::Receiver<()>,
) -> (CallDispatcher, CallRunner) {
    let (tx, rx) = mpsc::channel(queue_depth);
    let dispatcher = CallDispatcher::new(tx);
    let runner = CallRunner::new(rx, context, shutdown_rx);
    (dispatcher, runner)
}
