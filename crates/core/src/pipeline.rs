//! One validation/repair pass over every entity an [`EntitySource`] supplies.

use serde::Serialize;

use crate::engine::{EvaluationOptions, RuleEngine};
use crate::error::CoreError;
use crate::repair::{RepairBatchResult, RepairEngine};
use crate::rules::RuleSource;
use crate::store::{AuditStore, EntitySource, PropertyStore};
use crate::types::{DbId, Mode};
use crate::violation::Violation;

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub actor: String,
    pub evaluation: EvaluationOptions,
}

/// Result of [`run_pass`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: DbId,
    pub ruleset_id: String,
    pub mode: Mode,
    pub entities: usize,
    pub violations: Vec<Violation>,
    pub repairs: RepairBatchResult,
}

impl RunSummary {
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }
}

/// Load rules, record a run, evaluate, repair, and close the run.
///
/// Only violations whose effective mode is `repair` are written; validate
/// and simulate results are reported untouched. Rule and entity loading
/// faults abort the pass before anything is written.
pub async fn run_pass(
    rules: &dyn RuleSource,
    entities: &dyn EntitySource,
    properties: &dyn PropertyStore,
    audit: &dyn AuditStore,
    options: &PassOptions,
) -> Result<RunSummary, CoreError> {
    let document = rules.load_rules()?;
    let engine = RuleEngine::with_options(&document, options.evaluation);
    let mode = engine.pass_mode();

    let snapshot = entities.load_entities().await?;
    let run_id = audit.start_run(mode, &options.actor).await?;
    tracing::info!(
        run_id,
        ruleset_id = %document.ruleset.id,
        %mode,
        entities = snapshot.len(),
        "Starting pass"
    );

    let violations = engine.evaluate(&snapshot);
    let to_repair: Vec<Violation> = violations
        .iter()
        .filter(|v| v.mode == Mode::Repair)
        .cloned()
        .collect();

    let repairs = if to_repair.is_empty() {
        RepairBatchResult::default()
    } else {
        RepairEngine::new(properties, audit, &options.actor)
            .with_run(run_id)
            .repair_all(&to_repair)
            .await
    };

    if let Err(err) = audit
        .complete_run(run_id, violations.len(), repairs.succeeded())
        .await
    {
        tracing::error!(run_id, error = %err, "Failed to close run");
    }

    tracing::info!(
        run_id,
        violations = violations.len(),
        repaired = repairs.succeeded(),
        repair_failures = repairs.failed(),
        "Pass complete"
    );

    Ok(RunSummary {
        run_id,
        ruleset_id: document.ruleset.id.clone(),
        mode,
        entities: snapshot.len(),
        violations,
        repairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Student;
    use crate::memory::InMemoryStore;
    use crate::rules::{load_from_str, StaticRuleSource};
    use crate::types::EntityType;
    use assert_matches::assert_matches;

    const VISA_RULES: &str = r#"{
        "ruleset": { "id": "visa-rs", "name": "Visa" },
        "defaults": { "mode": "repair" },
        "rules": [{
            "id": "visa",
            "scope": "Student",
            "requirements": [{
                "property": "Visa",
                "required": true,
                "constraints": { "in": ["F1", "J1"] },
                "source": { "candidates": [ { "kind": "literal", "value": "F1" } ] }
            }]
        }]
    }"#;

    fn student(id: i64, visa: Option<&str>) -> Student {
        Student {
            id,
            extended: [("Visa".to_string(), visa.map(str::to_string))].into(),
            ..Student::default()
        }
    }

    fn options(forced_mode: Option<Mode>) -> PassOptions {
        PassOptions {
            actor: "tester".into(),
            evaluation: EvaluationOptions { forced_mode },
        }
    }

    #[tokio::test]
    async fn repair_pass_writes_and_closes_run() {
        let rules = StaticRuleSource(load_from_str(VISA_RULES).unwrap());
        let store = InMemoryStore::new()
            .with_entity(student(1, None))
            .with_entity(student(2, Some("J1")));

        let summary = run_pass(&rules, &store, &store, &store, &options(None))
            .await
            .unwrap();

        assert_eq!(summary.mode, Mode::Repair);
        assert_eq!(summary.entities, 2);
        assert_eq!(summary.violation_count(), 1);
        assert_eq!(summary.repairs.succeeded(), 1);
        assert_eq!(store.value(EntityType::Student, 1, "Visa").await.as_deref(), Some("F1"));

        let runs = store.runs().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].violation_count, 1);
        assert_eq!(runs[0].repaired_count, 1);
        assert_eq!(store.audit_entries().await[0].run_id, Some(summary.run_id));
    }

    #[tokio::test]
    async fn forced_simulate_never_writes() {
        let rules = StaticRuleSource(load_from_str(VISA_RULES).unwrap());
        let store = InMemoryStore::new().with_entity(student(1, None));

        let summary = run_pass(&rules, &store, &store, &store, &options(Some(Mode::Simulate)))
            .await
            .unwrap();

        assert_eq!(summary.violations[0].proposed_value.as_deref(), Some("F1"));
        assert_eq!(summary.repairs.attempted(), 0);
        assert_eq!(store.value(EntityType::Student, 1, "Visa").await, None);
        assert!(store.audit_entries().await.is_empty());
    }

    #[tokio::test]
    async fn second_pass_finds_nothing_after_repair() {
        let rules = StaticRuleSource(load_from_str(VISA_RULES).unwrap());
        let store = InMemoryStore::new().with_entity(student(1, Some("M1")));

        run_pass(&rules, &store, &store, &store, &options(None)).await.unwrap();
        let second = run_pass(&rules, &store, &store, &store, &options(None))
            .await
            .unwrap();

        assert_eq!(second.violation_count(), 0);
    }

    #[tokio::test]
    async fn rule_load_failure_aborts_before_any_run() {
        struct Broken;
        impl RuleSource for Broken {
            fn load_rules(&self) -> Result<crate::rules::RuleDocument, CoreError> {
                Err(CoreError::InvalidRules("no rules".into()))
            }
        }
        let store = InMemoryStore::new();

        assert_matches!(
            run_pass(&Broken, &store, &store, &store, &options(None)).await,
            Err(CoreError::InvalidRules(_))
        );
        assert!(store.runs().await.is_empty());
    }
}
