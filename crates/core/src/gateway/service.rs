//! Gateway implementation.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error};

use crate::dispatch::{CallDispatcher, DispatchError};
use crate::metrics;
use crate::registry::{MilestoneIntelligence, MilestoneKind};

use super::types::{MilestoneUpdate, PipelineIntelligence};

/// Per-call entry points serving the worker-facing RPC surface.
///
/// Owns a dispatcher handle plus the request-independent context baked in
/// at startup. Every operation is one queued call unit; errors raised by
/// the registry inside a unit are logged and answered with the current
/// record (blank-fill) rather than propagated, so a single bad request
/// never takes the pipeline down. Only [`DispatchError::Unavailable`]
/// reaches callers, and only during shutdown.
pub struct IntelligenceGateway {
    dispatcher: CallDispatcher,
    run_id: String,
    config_json: String,
    previous_report: Option<Value>,
}

impl IntelligenceGateway {
    pub fn new(
        dispatcher: CallDispatcher,
        run_id: String,
        config_json: String,
        previous_report: Option<Value>,
    ) -> Self {
        Self {
            dispatcher,
            run_id,
            config_json,
            previous_report,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Aggregated intelligence for all milestones plus config context.
    pub async fn get_intelligence(&self) -> Result<PipelineIntelligence, DispatchError> {
        let run_id = self.run_id.clone();
        let config_json = self.config_json.clone();
        let previous_report = self.previous_report.clone();

        self.dispatcher
            .submit("get_intelligence", move |context| PipelineIntelligence {
                run_id,
                milestones: context.registry.milestones().to_vec(),
                config_json,
                previous_report,
            })
            .await
    }

    /// Mark a milestone running. The worker may report its own pid; zero
    /// keeps the pid recorded at spawn.
    pub async fn activate(
        &self,
        kind: MilestoneKind,
        process_id: u32,
    ) -> Result<MilestoneIntelligence, DispatchError> {
        self.dispatcher
            .submit("activate", move |context| {
                let now = Utc::now().timestamp();
                match context.registry.activate(kind, process_id, now) {
                    Ok(record) => {
                        metrics::MILESTONE_TRANSITIONS
                            .with_label_values(&[kind.wire_name(), "running"])
                            .inc();
                        record
                    }
                    Err(e) => {
                        error!("Error on activate for {}: {}", kind, e);
                        context.registry.get(kind).clone()
                    }
                }
            })
            .await
    }

    /// Store a worker-published update to its own record.
    pub async fn publish_intelligence(
        &self,
        kind: MilestoneKind,
        update: MilestoneUpdate,
    ) -> Result<MilestoneIntelligence, DispatchError> {
        self.dispatcher
            .submit("publish_intelligence", move |context| {
                let now = Utc::now().timestamp();
                match context
                    .registry
                    .publish(kind, update.condition, update.payload, now)
                {
                    Ok(record) => {
                        if let Some(condition) = update.condition {
                            metrics::MILESTONE_TRANSITIONS
                                .with_label_values(&[kind.wire_name(), condition.as_str()])
                                .inc();
                        }
                        record
                    }
                    Err(e) => {
                        error!("Error on publish_intelligence for {}: {}", kind, e);
                        context.registry.get(kind).clone()
                    }
                }
            })
            .await
    }

    /// Heartbeat: bump the milestone's last-update time.
    pub async fn keepalive(&self, kind: MilestoneKind) -> Result<(), DispatchError> {
        self.dispatcher
            .submit("keepalive", move |context| {
                let now = Utc::now().timestamp();
                if let Err(e) = context.registry.keepalive(kind, now) {
                    debug!("Keepalive ignored for {}: {}", kind, e);
                }
            })
            .await
    }

    /// Append one worker log message to the run transcript.
    pub async fn append_log(&self, message: String) -> Result<(), DispatchError> {
        self.dispatcher
            .submit("append_log", move |context| {
                context.transcript.append(Utc::now(), &message);
            })
            .await
    }

    /// Record the worker process backing a milestone, at spawn time.
    pub async fn record_process(
        &self,
        kind: MilestoneKind,
        process_id: u32,
        process_token: u64,
    ) -> Result<(), DispatchError> {
        self.dispatcher
            .submit("record_process", move |context| {
                context
                    .registry
                    .record_process(kind, process_id, process_token);
            })
            .await
    }

    /// Reset every milestone record. Runs once at pipeline start.
    pub async fn reset_pipeline(&self) -> Result<(), DispatchError> {
        self.dispatcher
            .submit("reset_pipeline", |context| {
                context.registry.reset_all();
            })
            .await
    }

    /// Reap an exited worker: clear its process identity, and fail the
    /// record if the worker died without reporting a terminal condition.
    pub async fn reap_worker(&self, kind: MilestoneKind) -> Result<(), DispatchError> {
        self.dispatcher
            .submit("reap_worker", move |context| {
                use crate::registry::MilestoneCondition;

                let record = context.registry.get_mut(kind);
                record.process_id = 0;
                record.process_token = 0;
                if record.condition == MilestoneCondition::Running {
                    error!("Milestone {} worker exited without reporting, marking failed", kind);
                    record.condition = MilestoneCondition::Failed;
                    metrics::MILESTONE_TRANSITIONS
                        .with_label_values(&[kind.wire_name(), "failed"])
                        .inc();
                }
            })
            .await
    }
}
