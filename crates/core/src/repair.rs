//! Repair engine: writes proposed values for repairable violations.
//!
//! A store fault on one item becomes a failure record and the loop moves on.
//! Audit writes are best-effort: their own faults are logged, never raised.

use serde::Serialize;

use crate::audit::AuditEntry;
use crate::store::{AuditStore, PropertyStore};
use crate::types::DbId;
use crate::violation::Violation;

/// Outcome of one attempted repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairRecord {
    pub violation: Violation,
    pub succeeded: bool,
    pub error: Option<String>,
    /// Id of the audit entry, when the audit write went through.
    pub audit_id: Option<DbId>,
}

/// Aggregate over a batch of violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairBatchResult {
    pub records: Vec<RepairRecord>,
    /// Violations that were not repairable and never attempted.
    pub skipped: usize,
}

impl RepairBatchResult {
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| !r.succeeded).count()
    }

    /// `succeeded / (succeeded + failed)`, or `0.0` when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.succeeded() + self.failed();
        if attempted == 0 {
            0.0
        } else {
            self.succeeded() as f64 / attempted as f64
        }
    }
}

pub struct RepairEngine<'a> {
    properties: &'a dyn PropertyStore,
    audit: &'a dyn AuditStore,
    actor: &'a str,
    run_id: Option<DbId>,
}

impl<'a> RepairEngine<'a> {
    pub fn new(properties: &'a dyn PropertyStore, audit: &'a dyn AuditStore, actor: &'a str) -> Self {
        Self {
            properties,
            audit,
            actor,
            run_id: None,
        }
    }

    /// Tag every audit entry with `run_id`.
    pub fn with_run(mut self, run_id: DbId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Repair every repairable violation in order; the rest are counted as skipped.
    pub async fn repair_all(&self, violations: &[Violation]) -> RepairBatchResult {
        let mut result = RepairBatchResult::default();
        for violation in violations {
            if !violation.is_repairable() {
                result.skipped += 1;
                continue;
            }
            result.records.push(self.repair_one(violation).await);
        }
        tracing::info!(
            attempted = result.attempted(),
            succeeded = result.succeeded(),
            failed = result.failed(),
            skipped = result.skipped,
            "Repair batch complete"
        );
        result
    }

    /// Write one violation's proposed value and audit the outcome.
    pub async fn repair_one(&self, violation: &Violation) -> RepairRecord {
        let write = self
            .properties
            .upsert_extended_property(
                violation.entity_type,
                violation.entity_id,
                &violation.property,
                violation.proposed_value.as_deref(),
                self.actor,
            )
            .await;

        match write {
            Ok(()) => {
                tracing::info!(
                    rule_id = %violation.rule_id,
                    entity_type = %violation.entity_type,
                    entity_id = violation.entity_id,
                    property = %violation.property,
                    "Repaired extended property"
                );
                let audit_id = self
                    .write_audit_best_effort(&AuditEntry::for_repair(violation), None)
                    .await;
                RepairRecord {
                    violation: violation.clone(),
                    succeeded: true,
                    error: None,
                    audit_id,
                }
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    rule_id = %violation.rule_id,
                    entity_type = %violation.entity_type,
                    entity_id = violation.entity_id,
                    property = %violation.property,
                    error = %message,
                    "Repair write failed"
                );
                let audit_id = self
                    .write_audit_best_effort(&AuditEntry::for_failed_repair(violation), Some(&message))
                    .await;
                RepairRecord {
                    violation: violation.clone(),
                    succeeded: false,
                    error: Some(message),
                    audit_id,
                }
            }
        }
    }

    async fn write_audit_best_effort(&self, entry: &AuditEntry, notes: Option<&str>) -> Option<DbId> {
        match self.audit.write_audit(entry, self.actor, notes, self.run_id).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::error!(
                    entity_type = %entry.entity_type,
                    entity_id = entry.entity_id,
                    property = %entry.property,
                    action = %entry.action,
                    error = %err,
                    "Audit write failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::types::{EntityType, Mode, Severity};

    fn violation(entity_id: DbId, property: &str, proposed: Option<&str>) -> Violation {
        Violation {
            rule_id: "R".into(),
            entity_type: EntityType::Student,
            entity_id,
            property: property.into(),
            current_value: Some("old".into()),
            proposed_value: proposed.map(str::to_string),
            reason: "required".into(),
            severity: Severity::Error,
            action: "repair:upsert".into(),
            mode: Mode::Repair,
        }
    }

    #[tokio::test]
    async fn writes_value_and_audit_entry() {
        let store = InMemoryStore::new();
        let engine = RepairEngine::new(&store, &store, "tester").with_run(5);

        let result = engine.repair_all(&[violation(1, "Visa", Some("F1"))]).await;

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.success_rate(), 1.0);
        assert_eq!(store.value(EntityType::Student, 1, "Visa").await.as_deref(), Some("F1"));
        let audit = store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].run_id, Some(5));
        assert_eq!(audit[0].before_value.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn write_fault_becomes_failure_record_and_loop_continues() {
        let store = InMemoryStore::new().failing_writes_for("Visa");
        let engine = RepairEngine::new(&store, &store, "tester");

        let result = engine
            .repair_all(&[violation(1, "Visa", Some("F1")), violation(1, "Track", Some("UG"))])
            .await;

        assert_eq!(result.attempted(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.success_rate(), 0.5);
        assert!(result.records[0].error.as_deref().unwrap().contains("Visa"));
        let actions: Vec<String> = store.audit_entries().await.into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["repair:failed", "repair:upsert"]);
    }

    #[tokio::test]
    async fn audit_fault_never_masks_the_repair() {
        let store = InMemoryStore::new().failing_audit_writes();
        let engine = RepairEngine::new(&store, &store, "tester");

        let result = engine.repair_all(&[violation(1, "Visa", Some("F1"))]).await;

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.records[0].audit_id, None);
    }

    #[tokio::test]
    async fn unrepairable_violations_are_skipped() {
        let store = InMemoryStore::new();
        let engine = RepairEngine::new(&store, &store, "tester");

        let result = engine.repair_all(&[violation(1, "Visa", None)]).await;

        assert_eq!(result.skipped, 1);
        assert_eq!(result.attempted(), 0);
        assert_eq!(result.success_rate(), 0.0);
    }
}
