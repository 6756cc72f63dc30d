//! Sequential pipeline driver.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::WorkersConfig;
use crate::dispatch::DispatchError;
use crate::gateway::IntelligenceGateway;
use crate::metrics;
use crate::registry::MilestoneKind;

use super::spawner::WorkerSpawner;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The dispatcher went away mid-run; without it no state can be
    /// recorded, so the run cannot continue.
    #[error("dispatcher unavailable: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Runs the configured milestones one at a time, in stage order.
///
/// Each stage: record the spawned worker's identity, wait for it to
/// exit, then reap the record. A stage that fails to spawn, or whose
/// worker dies without reporting, ends up Failed; later stages still
/// run, because the report stage must execute after failures to publish
/// them.
pub struct PipelineDriver {
    gateway: Arc<IntelligenceGateway>,
    spawner: Arc<dyn WorkerSpawner>,
    workers: WorkersConfig,
}

impl PipelineDriver {
    pub fn new(
        gateway: Arc<IntelligenceGateway>,
        spawner: Arc<dyn WorkerSpawner>,
        workers: WorkersConfig,
    ) -> Self {
        Self {
            gateway,
            spawner,
            workers,
        }
    }

    /// Drive the whole pipeline once. Returns when every configured
    /// stage has run to completion or failure.
    pub async fn run(&self) -> Result<(), DriverError> {
        info!("Pipeline run starting");
        self.gateway.reset_pipeline().await?;

        for kind in MilestoneKind::ALL {
            let Some(command) = self.workers.command_for(kind) else {
                debug!("No worker configured for {}, skipping", kind);
                continue;
            };

            let mut worker = match self.spawner.spawn(kind, command).await {
                Ok(worker) => worker,
                Err(e) => {
                    error!("Could not start {} worker: {}", kind, e);
                    continue;
                }
            };

            let process = worker.process();
            self.gateway
                .record_process(kind, process.pid, process.token)
                .await?;
            metrics::WORKERS_SPAWNED
                .with_label_values(&[kind.wire_name()])
                .inc();
            info!("Milestone {} worker started (pid {})", kind, process.pid);

            match worker.wait().await {
                Ok(true) => info!("Milestone {} worker exited cleanly", kind),
                Ok(false) => error!("Milestone {} worker exited with failure", kind),
                Err(e) => error!("Lost track of {} worker: {}", kind, e),
            }

            self.gateway.reap_worker(kind).await?;
        }

        info!("Pipeline run finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCommand;
    use crate::dispatch::{create_call_dispatch, shared_context};
    use crate::registry::MilestoneCondition;
    use crate::testing::MockSpawner;
    use tokio::sync::broadcast;

    fn workers_all_configured() -> WorkersConfig {
        let cmd = |name: &str| {
            Some(WorkerCommand {
                command: name.to_string(),
                args: vec![],
            })
        };
        WorkersConfig {
            initial_setup: cmd("setup-worker"),
            content_sync: cmd("sync-worker"),
            run_report: cmd("report-worker"),
        }
    }

    #[tokio::test]
    async fn test_driver_spawns_stages_in_order() {
        let context = shared_context();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (dispatcher, runner) = create_call_dispatch(context.clone(), 32, shutdown_rx);
        let runner_handle = tokio::spawn(runner.run());
        let gateway = Arc::new(IntelligenceGateway::new(
            dispatcher,
            "r".to_string(),
            "{}".to_string(),
            None,
        ));

        let spawner = Arc::new(MockSpawner::new());
        let driver = PipelineDriver::new(gateway, spawner.clone(), workers_all_configured());
        driver.run().await.unwrap();

        let spawned = spawner.recorded_spawns().await;
        assert_eq!(
            spawned,
            vec![
                MilestoneKind::InitialSetup,
                MilestoneKind::ContentSync,
                MilestoneKind::RunReport,
            ]
        );

        let _ = shutdown_tx.send(());
        runner_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_driver_reaps_silent_worker_as_failed() {
        let context = shared_context();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (dispatcher, runner) = create_call_dispatch(context.clone(), 32, shutdown_rx);
        let runner_handle = tokio::spawn(runner.run());
        let gateway = Arc::new(IntelligenceGateway::new(
            dispatcher,
            "r".to_string(),
            "{}".to_string(),
            None,
        ));

        // Worker activates itself but never reports a terminal condition.
        let spawner = Arc::new(MockSpawner::new());
        spawner
            .set_on_spawn({
                let gateway = Arc::clone(&gateway);
                move |kind| {
                    let gateway = Arc::clone(&gateway);
                    Box::pin(async move {
                        let _ = gateway.activate(kind, 0).await;
                    })
                }
            })
            .await;

        let workers = WorkersConfig {
            initial_setup: Some(WorkerCommand {
                command: "setup-worker".to_string(),
                args: vec![],
            }),
            ..Default::default()
        };
        let driver = PipelineDriver::new(Arc::clone(&gateway), spawner, workers);
        driver.run().await.unwrap();

        let intelligence = gateway.get_intelligence().await.unwrap();
        let setup = intelligence
            .milestones
            .iter()
            .find(|m| m.kind == MilestoneKind::InitialSetup)
            .unwrap();
        assert_eq!(setup.condition, MilestoneCondition::Failed);
        assert_eq!(setup.process_id, 0);

        let _ = shutdown_tx.send(());
        runner_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_driver_continues_past_spawn_failure() {
        let context = shared_context();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (dispatcher, runner) = create_call_dispatch(context, 32, shutdown_rx);
        let runner_handle = tokio::spawn(runner.run());
        let gateway = Arc::new(IntelligenceGateway::new(
            dispatcher,
            "r".to_string(),
            "{}".to_string(),
            None,
        ));

        let spawner = Arc::new(MockSpawner::new());
        spawner.fail_spawn_for(MilestoneKind::InitialSetup).await;

        let driver = PipelineDriver::new(gateway, spawner.clone(), workers_all_configured());
        driver.run().await.unwrap();

        // Later stages still ran.
        let spawned = spawner.recorded_spawns().await;
        assert_eq!(
            spawned,
            vec![MilestoneKind::ContentSync, MilestoneKind::RunReport]
        );

        let _ = shutdown_tx.send(());
        runner_handle.await.unwrap();
    }
}
