//! The ordered milestone registry.

use serde_json::Value;

use super::types::{MilestoneCondition, MilestoneIntelligence, MilestoneKind};
use super::RegistryError;

/// Ordered collection of milestone intelligence records, one per kind.
///
/// Insertion order mirrors pipeline stage order and is fixed for the
/// process lifetime. The registry itself carries no locking; exclusive
/// access is the caller's concern (dispatcher confinement, or the
/// watchdog holding the shared context mutex).
#[derive(Debug, Clone)]
pub struct MilestoneRegistry {
    milestones: Vec<MilestoneIntelligence>,
}

impl Default for MilestoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MilestoneRegistry {
    pub fn new() -> Self {
        Self {
            milestones: MilestoneKind::ALL
                .iter()
                .map(|kind| MilestoneIntelligence::new(*kind))
                .collect(),
        }
    }

    /// All records in pipeline stage order.
    pub fn milestones(&self) -> &[MilestoneIntelligence] {
        &self.milestones
    }

    pub fn get(&self, kind: MilestoneKind) -> &MilestoneIntelligence {
        self.milestones
            .iter()
            .find(|m| m.kind == kind)
            .expect("registry holds every kind")
    }

    pub fn get_mut(&mut self, kind: MilestoneKind) -> &mut MilestoneIntelligence {
        self.milestones
            .iter_mut()
            .find(|m| m.kind == kind)
            .expect("registry holds every kind")
    }

    /// Reset every record to the pre-run state. Called once at pipeline
    /// start; this is the only path back to `NotStarted`.
    pub fn reset_all(&mut self) {
        for milestone in &mut self.milestones {
            milestone.reset();
        }
    }

    /// Record the worker process backing a milestone. Written at spawn
    /// time, before the worker has activated itself.
    pub fn record_process(&mut self, kind: MilestoneKind, process_id: u32, process_token: u64) {
        let record = self.get_mut(kind);
        record.process_id = process_id;
        record.process_token = process_token;
    }

    /// Transition a milestone to `Running` and stamp its start time.
    ///
    /// A worker may report its own pid here; zero keeps whatever was
    /// recorded at spawn.
    pub fn activate(
        &mut self,
        kind: MilestoneKind,
        process_id: u32,
        now: i64,
    ) -> Result<MilestoneIntelligence, RegistryError> {
        self.apply_condition(kind, MilestoneCondition::Running, now)?;
        let record = self.get_mut(kind);
        record.start_time = now;
        if process_id != 0 {
            record.process_id = process_id;
        }
        Ok(record.clone())
    }

    /// Apply a condition transition, enforcing the forward-only table.
    /// Bumps `last_update` on success.
    pub fn apply_condition(
        &mut self,
        kind: MilestoneKind,
        next: MilestoneCondition,
        now: i64,
    ) -> Result<(), RegistryError> {
        let record = self.get_mut(kind);
        if !record.condition.can_transition_to(next) {
            return Err(RegistryError::InvalidTransition {
                kind: kind.wire_name(),
                from: record.condition.as_str(),
                to: next.as_str(),
            });
        }
        record.condition = next;
        record.last_update = record.last_update.max(now);
        Ok(())
    }

    /// Store a worker-published update: optional condition transition plus
    /// the kind-specific payload, stored verbatim.
    pub fn publish(
        &mut self,
        kind: MilestoneKind,
        condition: Option<MilestoneCondition>,
        payload: Option<Value>,
        now: i64,
    ) -> Result<MilestoneIntelligence, RegistryError> {
        if let Some(next) = condition {
            let current = self.get(kind).condition;
            if next != current {
                self.apply_condition(kind, next, now)?;
            }
        }
        let record = self.get_mut(kind);
        if let Some(payload) = payload {
            record.payload = payload;
        }
        record.last_update = record.last_update.max(now);
        Ok(record.clone())
    }

    /// Bump `last_update` for a running milestone.
    pub fn keepalive(&mut self, kind: MilestoneKind, now: i64) -> Result<(), RegistryError> {
        let record = self.get_mut(kind);
        if record.condition != MilestoneCondition::Running {
            return Err(RegistryError::NotRunning(kind.wire_name()));
        }
        record.last_update = record.last_update.max(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_all_kinds_in_order() {
        let registry = MilestoneRegistry::new();
        let kinds: Vec<MilestoneKind> = registry.milestones().iter().map(|m| m.kind).collect();
        assert_eq!(kinds, MilestoneKind::ALL.to_vec());
    }

    #[test]
    fn test_order_stable_across_mutation() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::RunReport, 7, 100).unwrap();
        registry.activate(MilestoneKind::InitialSetup, 3, 101).unwrap();

        let kinds: Vec<MilestoneKind> = registry.milestones().iter().map(|m| m.kind).collect();
        assert_eq!(kinds, MilestoneKind::ALL.to_vec());
    }

    #[test]
    fn test_activate_stamps_times_and_pid() {
        let mut registry = MilestoneRegistry::new();
        let record = registry.activate(MilestoneKind::InitialSetup, 42, 1000).unwrap();

        assert_eq!(record.condition, MilestoneCondition::Running);
        assert_eq!(record.start_time, 1000);
        assert_eq!(record.last_update, 1000);
        assert_eq!(record.process_id, 42);
    }

    #[test]
    fn test_activate_keeps_spawn_recorded_pid_when_zero() {
        let mut registry = MilestoneRegistry::new();
        registry.record_process(MilestoneKind::ContentSync, 77, 5555);
        let record = registry.activate(MilestoneKind::ContentSync, 0, 1000).unwrap();

        assert_eq!(record.process_id, 77);
        assert_eq!(record.process_token, 5555);
    }

    #[test]
    fn test_activate_twice_fails() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::InitialSetup, 1, 10).unwrap();
        let result = registry.activate(MilestoneKind::InitialSetup, 1, 11);
        assert!(matches!(result, Err(RegistryError::InvalidTransition { .. })));
    }

    #[test]
    fn test_publish_updates_payload_and_condition() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::ContentSync, 9, 100).unwrap();

        let record = registry
            .publish(
                MilestoneKind::ContentSync,
                Some(MilestoneCondition::Completed),
                Some(serde_json::json!({"items_processed": 12})),
                150,
            )
            .unwrap();

        assert_eq!(record.condition, MilestoneCondition::Completed);
        assert_eq!(record.payload["items_processed"], 12);
        assert_eq!(record.last_update, 150);
    }

    #[test]
    fn test_publish_same_condition_is_not_a_transition() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::ContentSync, 9, 100).unwrap();

        // Re-publishing Running with a fresh payload must not trip the
        // transition table.
        let record = registry
            .publish(
                MilestoneKind::ContentSync,
                Some(MilestoneCondition::Running),
                Some(serde_json::json!({"items_processed": 3})),
                120,
            )
            .unwrap();

        assert_eq!(record.condition, MilestoneCondition::Running);
        assert_eq!(record.last_update, 120);
    }

    #[test]
    fn test_publish_illegal_jump_rejected() {
        let mut registry = MilestoneRegistry::new();
        let result = registry.publish(
            MilestoneKind::RunReport,
            Some(MilestoneCondition::Completed),
            None,
            100,
        );
        assert!(matches!(result, Err(RegistryError::InvalidTransition { .. })));
    }

    #[test]
    fn test_keepalive_bumps_last_update() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::InitialSetup, 1, 100).unwrap();
        registry.keepalive(MilestoneKind::InitialSetup, 160).unwrap();
        assert_eq!(registry.get(MilestoneKind::InitialSetup).last_update, 160);
    }

    #[test]
    fn test_keepalive_never_moves_backwards() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::InitialSetup, 1, 100).unwrap();
        registry.keepalive(MilestoneKind::InitialSetup, 90).unwrap();
        assert_eq!(registry.get(MilestoneKind::InitialSetup).last_update, 100);
    }

    #[test]
    fn test_keepalive_requires_running() {
        let mut registry = MilestoneRegistry::new();
        let result = registry.keepalive(MilestoneKind::InitialSetup, 100);
        assert!(matches!(result, Err(RegistryError::NotRunning(_))));
    }

    #[test]
    fn test_reset_all_allows_reactivation() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::InitialSetup, 1, 100).unwrap();
        registry
            .apply_condition(MilestoneKind::InitialSetup, MilestoneCondition::Failed, 110)
            .unwrap();

        registry.reset_all();

        assert_eq!(
            registry.get(MilestoneKind::InitialSetup).condition,
            MilestoneCondition::NotStarted
        );
        assert!(registry.activate(MilestoneKind::InitialSetup, 2, 200).is_ok());
    }

    #[test]
    fn test_repeated_serialization_is_identical() {
        let mut registry = MilestoneRegistry::new();
        registry.activate(MilestoneKind::InitialSetup, 11, 500).unwrap();

        let first = serde_json::to_string(registry.milestones()).unwrap();
        let second = serde_json::to_string(registry.milestones()).unwrap();
        assert_eq!(first, second);
    }
}
