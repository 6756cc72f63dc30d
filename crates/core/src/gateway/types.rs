//! Wire types for the gateway surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{MilestoneCondition, MilestoneIntelligence};

/// Aggregated intelligence for the whole pipeline, plus the environment
/// context workers need: the active configuration and the previous run's
/// report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineIntelligence {
    pub run_id: String,
    pub milestones: Vec<MilestoneIntelligence>,
    pub config_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_report: Option<Value>,
}

impl Default for PipelineIntelligence {
    fn default() -> Self {
        Self {
            run_id: String::new(),
            milestones: Vec::new(),
            config_json: String::new(),
            previous_report: None,
        }
    }
}

/// A worker-published update to its own milestone record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MilestoneUpdate {
    /// New condition, if the worker is reporting a transition.
    #[serde(default)]
    pub condition: Option<MilestoneCondition>,
    /// Kind-specific payload, stored verbatim.
    #[serde(default)]
    pub payload: Option<Value>,
}
