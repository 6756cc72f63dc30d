//! Milestone identity and lifecycle types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RegistryError;

/// The fixed set of pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    InitialSetup,
    ContentSync,
    RunReport,
}

impl MilestoneKind {
    /// All kinds in pipeline stage order. Registry insertion order is
    /// derived from this and never changes for the process lifetime.
    pub const ALL: [MilestoneKind; 3] = [
        MilestoneKind::InitialSetup,
        MilestoneKind::ContentSync,
        MilestoneKind::RunReport,
    ];

    /// Stable wire name used in routes and report blocks.
    pub fn wire_name(&self) -> &'static str {
        match self {
            MilestoneKind::InitialSetup => "initial_setup",
            MilestoneKind::ContentSync => "content_sync",
            MilestoneKind::RunReport => "run_report",
        }
    }

    /// Human-readable stage name used in the report status line.
    pub fn display_name(&self) -> &'static str {
        match self {
            MilestoneKind::InitialSetup => "Initial Setup",
            MilestoneKind::ContentSync => "Content Sync",
            MilestoneKind::RunReport => "Run Report",
        }
    }

    /// The last stage of the pipeline.
    pub fn final_stage() -> MilestoneKind {
        *MilestoneKind::ALL.last().expect("at least one stage")
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for MilestoneKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MilestoneKind::ALL
            .iter()
            .copied()
            .find(|k| k.wire_name() == s)
            .ok_or_else(|| RegistryError::UnknownKind(s.to_string()))
    }
}

/// Lifecycle state of one milestone.
///
/// Forward transitions during a single pipeline run are limited to
/// `NotStarted -> Running` and `Running -> {Completed, Failed, Blocked}`.
/// The only way back to `NotStarted` is the registry-wide reset at
/// pipeline start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneCondition {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed,
    Blocked,
}

impl MilestoneCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneCondition::NotStarted => "not_started",
            MilestoneCondition::Running => "running",
            MilestoneCondition::Completed => "completed",
            MilestoneCondition::Failed => "failed",
            MilestoneCondition::Blocked => "blocked",
        }
    }

    /// Whether this condition ends the milestone for the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MilestoneCondition::Completed | MilestoneCondition::Failed | MilestoneCondition::Blocked
        )
    }

    /// Forward transition table for a single pipeline run.
    pub fn can_transition_to(&self, next: MilestoneCondition) -> bool {
        matches!(
            (self, next),
            (MilestoneCondition::NotStarted, MilestoneCondition::Running)
                | (MilestoneCondition::Running, MilestoneCondition::Completed)
                | (MilestoneCondition::Running, MilestoneCondition::Failed)
                | (MilestoneCondition::Running, MilestoneCondition::Blocked)
        )
    }
}

impl fmt::Display for MilestoneCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One milestone's mutable intelligence record.
///
/// Timestamps are Unix seconds and stay zero until the milestone starts.
/// `process_id` of zero means no live worker backs the record. The
/// `payload` is owned by the worker for that stage; the orchestration
/// core stores and serves it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneIntelligence {
    pub kind: MilestoneKind,
    pub condition: MilestoneCondition,
    pub start_time: i64,
    pub last_update: i64,
    pub process_id: u32,
    #[serde(default)]
    pub process_token: u64,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl MilestoneIntelligence {
    pub fn new(kind: MilestoneKind) -> Self {
        Self {
            kind,
            condition: MilestoneCondition::NotStarted,
            start_time: 0,
            last_update: 0,
            process_id: 0,
            process_token: 0,
            payload: serde_json::Value::Null,
        }
    }

    /// Reset to the pristine pre-run state, keeping only the kind.
    pub fn reset(&mut self) {
        *self = MilestoneIntelligence::new(self.kind);
    }
}
