//! Builds the pipeline report JSON from the final registry snapshot.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{MilestoneCondition, MilestoneIntelligence, MilestoneKind};

use super::ReportError;

/// The externally visible result of one pipeline run: a status line, the
/// verbatim intelligence for each milestone in stage order, and the
/// worker log transcript. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub status: String,
    pub run_id: String,
    pub generated_at: String,
    pub milestones: Vec<MilestoneIntelligence>,
    pub logs: String,
}

/// Root wrapper for the report file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRoot {
    pub pipeline_report: PipelineReport,
}

/// Pure transformation from a registry snapshot to the report.
/// Deterministic given its inputs; the generation time is an input, not
/// read from a clock.
pub struct ReportBuilder {
    milestones: Vec<MilestoneIntelligence>,
    logs: String,
    run_id: String,
    generated_at: DateTime<Utc>,
}

impl ReportBuilder {
    pub fn new(
        milestones: Vec<MilestoneIntelligence>,
        logs: String,
        run_id: String,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            milestones,
            logs,
            run_id,
            generated_at,
        }
    }

    /// The status line, chosen by priority: the first failed milestone in
    /// stage order wins (so a setup failure beats any later success),
    /// then a completed final stage reports the run time, else the state
    /// of the pipeline is unknown.
    fn status(&self) -> String {
        for milestone in &self.milestones {
            if milestone.condition == MilestoneCondition::Failed {
                return format!("{} Failed", milestone.kind.display_name());
            }
        }

        let final_completed = self
            .milestones
            .iter()
            .any(|m| m.kind == MilestoneKind::final_stage() && m.condition == MilestoneCondition::Completed);
        if final_completed {
            return format!("Last Run {}", self.generated_at.format("%Y-%m-%dT%H:%M:%SZ"));
        }

        "Unknown".to_string()
    }

    pub fn build(self) -> ReportRoot {
        let status = self.status();
        ReportRoot {
            pipeline_report: PipelineReport {
                status,
                run_id: self.run_id,
                generated_at: self.generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                milestones: self.milestones,
                logs: self.logs,
            },
        }
    }
}

/// Serialize a report and write it to the configured path.
pub fn write_report(path: &Path, report: &ReportRoot) -> Result<(), ReportError> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|e| ReportError::Serialize(e.to_string()))?;
    std::fs::write(path, rendered).map_err(|e| ReportError::Write {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MilestoneRegistry;
    use chrono::TimeZone;

    fn snapshot(
        setup: MilestoneCondition,
        sync: MilestoneCondition,
        report: MilestoneCondition,
    ) -> Vec<MilestoneIntelligence> {
        let mut registry = MilestoneRegistry::new();
        for (kind, condition) in [
            (MilestoneKind::InitialSetup, setup),
            (MilestoneKind::ContentSync, sync),
            (MilestoneKind::RunReport, report),
        ] {
            if condition != MilestoneCondition::NotStarted {
                registry.activate(kind, 1, 100).unwrap();
            }
            if condition.is_terminal() {
                registry.apply_condition(kind, condition, 200).unwrap();
            }
        }
        registry.milestones().to_vec()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn build_status(
        setup: MilestoneCondition,
        sync: MilestoneCondition,
        report: MilestoneCondition,
    ) -> String {
        ReportBuilder::new(snapshot(setup, sync, report), String::new(), "r".into(), at())
            .build()
            .pipeline_report
            .status
    }

    #[test]
    fn test_setup_failure_beats_later_success() {
        use MilestoneCondition::*;
        assert_eq!(build_status(Failed, Completed, Completed), "Initial Setup Failed");
    }

    #[test]
    fn test_first_failed_stage_named() {
        use MilestoneCondition::*;
        assert_eq!(build_status(Completed, Failed, Completed), "Content Sync Failed");
        assert_eq!(build_status(Completed, Completed, Failed), "Run Report Failed");
    }

    #[test]
    fn test_all_completed_reports_last_run() {
        use MilestoneCondition::*;
        assert_eq!(
            build_status(Completed, Completed, Completed),
            "Last Run 2024-06-15T09:30:00Z"
        );
    }

    #[test]
    fn test_incomplete_pipeline_is_unknown() {
        use MilestoneCondition::*;
        assert_eq!(build_status(Completed, Running, NotStarted), "Unknown");
        assert_eq!(build_status(Completed, Blocked, NotStarted), "Unknown");
        assert_eq!(build_status(NotStarted, NotStarted, NotStarted), "Unknown");
    }

    #[test]
    fn test_report_preserves_stage_order_and_logs() {
        use MilestoneCondition::*;
        let report = ReportBuilder::new(
            snapshot(Completed, Completed, Completed),
            "[t] line one\n[t] line two".to_string(),
            "run-9".to_string(),
            at(),
        )
        .build();

        let kinds: Vec<MilestoneKind> = report
            .pipeline_report
            .milestones
            .iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(kinds, MilestoneKind::ALL.to_vec());
        assert_eq!(report.pipeline_report.run_id, "run-9");
        assert!(report.pipeline_report.logs.contains("line two"));
    }

    #[test]
    fn test_build_is_byte_deterministic() {
        use MilestoneCondition::*;
        let build = || {
            serde_json::to_string(
                &ReportBuilder::new(
                    snapshot(Completed, Failed, NotStarted),
                    "logs".to_string(),
                    "run-1".to_string(),
                    at(),
                )
                .build(),
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_write_report_round_trips() {
        use MilestoneCondition::*;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = ReportBuilder::new(
            snapshot(Completed, Completed, Completed),
            String::new(),
            "run-2".to_string(),
            at(),
        )
        .build();
        write_report(&path, &report).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ReportRoot = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.pipeline_report.status, report.pipeline_report.status);
        assert_eq!(parsed.pipeline_report.milestones.len(), 3);
    }
}
