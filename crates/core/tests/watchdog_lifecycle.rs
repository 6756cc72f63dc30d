//! Lifetime watchdog integration tests.
//!
//! Drives the real watchdog loop against the shared context, with the
//! terminator mocked out, and checks the kill/no-kill decisions end to
//! end through the gateway surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use milo_core::testing::MockTerminator;
use milo_core::{
    create_call_dispatch, shared_context, IntelligenceGateway, LifetimeConfig, LifetimeWatchdog,
    MilestoneCondition, MilestoneKind, MilestoneUpdate,
};

struct Harness {
    context: milo_core::SharedCallContext,
    gateway: Arc<IntelligenceGateway>,
    terminator: Arc<MockTerminator>,
    shutdown_tx: broadcast::Sender<()>,
    runner_handle: tokio::task::JoinHandle<()>,
    watchdog_handle: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn start(config: LifetimeConfig) -> Self {
        let context = shared_context();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        let (dispatcher, runner) = create_call_dispatch(context.clone(), 32, shutdown_rx);
        let runner_handle = tokio::spawn(runner.run());

        let gateway = Arc::new(IntelligenceGateway::new(
            dispatcher,
            "watchdog-test".to_string(),
            "{}".to_string(),
            None,
        ));

        let terminator = Arc::new(MockTerminator::new());
        let watchdog = LifetimeWatchdog::new(
            config,
            context.clone(),
            terminator.clone(),
            shutdown_tx.subscribe(),
        );
        let watchdog_handle = tokio::spawn(watchdog.run());

        Self {
            context,
            gateway,
            terminator,
            shutdown_tx,
            runner_handle,
            watchdog_handle,
        }
    }

    /// Backdate a running milestone's clocks so the next tick sees it as
    /// stale.
    async fn backdate(&self, kind: MilestoneKind, start_ago: i64, update_ago: i64) {
        let mut context = self.context.lock().await;
        let record = context.registry.get_mut(kind);
        let now = Utc::now().timestamp();
        record.start_time = now - start_ago;
        record.last_update = now - update_ago;
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.runner_handle.await.unwrap();
        self.watchdog_handle.await.unwrap();
    }
}

fn fast_config() -> LifetimeConfig {
    LifetimeConfig {
        max_update_dwell_secs: 30,
        max_run_secs: 600,
        poll_interval_secs: 1,
    }
}

#[tokio::test]
async fn test_stale_running_milestone_is_killed() {
    let harness = Harness::start(fast_config());

    harness
        .gateway
        .record_process(MilestoneKind::ContentSync, 4242, 99)
        .await
        .unwrap();
    harness
        .gateway
        .activate(MilestoneKind::ContentSync, 0)
        .await
        .unwrap();
    harness.backdate(MilestoneKind::ContentSync, 120, 60).await;

    // Give the loop a couple of ticks.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let calls = harness.terminator.recorded_calls();
    assert_eq!(calls.len(), 1, "termination must be invoked exactly once");
    assert_eq!(calls[0].pid, 4242);
    assert_eq!(calls[0].token, 99);

    let intelligence = harness.gateway.get_intelligence().await.unwrap();
    let record = intelligence
        .milestones
        .iter()
        .find(|m| m.kind == MilestoneKind::ContentSync)
        .unwrap();
    assert_eq!(record.condition, MilestoneCondition::Failed);

    harness.stop().await;
}

#[tokio::test]
async fn test_heartbeating_milestone_survives() {
    let harness = Harness::start(fast_config());

    harness
        .gateway
        .record_process(MilestoneKind::ContentSync, 4242, 99)
        .await
        .unwrap();
    harness
        .gateway
        .activate(MilestoneKind::ContentSync, 0)
        .await
        .unwrap();

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(600)).await;
        harness
            .gateway
            .keepalive(MilestoneKind::ContentSync)
            .await
            .unwrap();
    }

    assert!(harness.terminator.recorded_calls().is_empty());
    let intelligence = harness.gateway.get_intelligence().await.unwrap();
    let record = intelligence
        .milestones
        .iter()
        .find(|m| m.kind == MilestoneKind::ContentSync)
        .unwrap();
    assert_eq!(record.condition, MilestoneCondition::Running);

    harness.stop().await;
}

#[tokio::test]
async fn test_completion_racing_the_watchdog_wins_under_the_lock() {
    let harness = Harness::start(fast_config());

    harness
        .gateway
        .record_process(MilestoneKind::ContentSync, 4242, 99)
        .await
        .unwrap();
    harness
        .gateway
        .activate(MilestoneKind::ContentSync, 0)
        .await
        .unwrap();
    // The worker reports completion; afterwards its clocks go stale
    // enough that a kill would have fired had it still been running.
    harness
        .gateway
        .publish_intelligence(
            MilestoneKind::ContentSync,
            MilestoneUpdate {
                condition: Some(MilestoneCondition::Completed),
                payload: None,
            },
        )
        .await
        .unwrap();
    harness.backdate(MilestoneKind::ContentSync, 120, 60).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;

    // The watchdog re-checks the condition atomically, so the completed
    // record is left alone.
    assert!(harness.terminator.recorded_calls().is_empty());
    let intelligence = harness.gateway.get_intelligence().await.unwrap();
    let record = intelligence
        .milestones
        .iter()
        .find(|m| m.kind == MilestoneKind::ContentSync)
        .unwrap();
    assert_eq!(record.condition, MilestoneCondition::Completed);

    harness.stop().await;
}

#[tokio::test]
async fn test_watchdog_stops_on_shutdown() {
    let harness = Harness::start(LifetimeConfig {
        poll_interval_secs: 3600,
        ..fast_config()
    });

    let _ = harness.shutdown_tx.send(());
    // A sleeping watchdog must still observe shutdown promptly.
    tokio::time::timeout(Duration::from_secs(2), harness.watchdog_handle)
        .await
        .expect("watchdog must stop without waiting out its interval")
        .unwrap();

    harness.runner_handle.await.unwrap();
}
