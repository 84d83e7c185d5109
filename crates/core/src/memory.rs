//! In-process implementation of every store contract.
//!
//! Backs the engine tests and the CLI's offline mode (`--entities <file>`).
//! Writes and audit appends can be made to fail per property code so the
//! fault-tolerance paths are reachable without a database.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::audit::{AuditEntry, RepairEventFilter};
use crate::entity::{Entity, EntityProjection};
use crate::error::StoreError;
use crate::store::{AuditStore, EntitySource, PropertyDefinition, PropertyStore};
use crate::types::{DbId, EntityType, Mode, Timestamp};

type ValueKey = (EntityType, DbId, String);

/// One recorded run, exposed for assertions and offline summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: DbId,
    pub mode: Mode,
    pub actor: String,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub violation_count: usize,
    pub repaired_count: usize,
}

#[derive(Debug, Default)]
struct State {
    values: BTreeMap<ValueKey, Option<String>>,
    definitions: Vec<PropertyDefinition>,
    audit: Vec<AuditEntry>,
    runs: Vec<RunRecord>,
    entities: Vec<Entity>,
    failing_writes: HashSet<String>,
    ignored_writes: HashSet<String>,
    fail_audit: bool,
    next_audit_id: DbId,
    next_run_id: DbId,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity and seed the store with its extended values.
    pub fn with_entity(mut self, entity: impl Into<Entity>) -> Self {
        let entity = entity.into();
        let state = self.state.get_mut();
        let (entity_type, entity_id) = (entity.entity_type(), entity.entity_id());
        for (code, value) in entity.extended_properties() {
            state
                .values
                .insert((entity_type, entity_id, code.clone()), value.clone());
        }
        state.entities.push(entity);
        self
    }

    pub fn with_entities(self, entities: impl IntoIterator<Item = Entity>) -> Self {
        entities.into_iter().fold(self, |store, entity| store.with_entity(entity))
    }

    pub fn with_definition(mut self, definition: PropertyDefinition) -> Self {
        self.state.get_mut().definitions.push(definition);
        self
    }

    /// Writes and deletes of `property_code` fail with a backend error.
    pub fn failing_writes_for(mut self, property_code: &str) -> Self {
        self.state
            .get_mut()
            .failing_writes
            .insert(property_code.to_string());
        self
    }

    /// Writes and deletes of `property_code` report success but change nothing.
    pub fn ignoring_writes_for(mut self, property_code: &str) -> Self {
        self.state
            .get_mut()
            .ignored_writes
            .insert(property_code.to_string());
        self
    }

    /// Every audit append fails.
    pub fn failing_audit_writes(mut self) -> Self {
        self.state.get_mut().fail_audit = true;
        self
    }

    pub async fn value(&self, entity_type: EntityType, entity_id: DbId, property_code: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .values
            .get(&(entity_type, entity_id, property_code.to_string()))
            .cloned()
            .flatten()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }

    pub async fn runs(&self) -> Vec<RunRecord> {
        self.state.lock().await.runs.clone()
    }
}

fn check_write(state: &State, property_code: &str) -> Result<bool, StoreError> {
    if state.failing_writes.contains(property_code) {
        return Err(StoreError::Backend(format!(
            "write rejected for property {property_code}"
        )));
    }
    Ok(!state.ignored_writes.contains(property_code))
}

// ---------------------------------------------------------------------------
// PropertyStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PropertyStore for InMemoryStore {
    async fn upsert_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        value: Option<&str>,
        _actor: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if check_write(&state, property_code)? {
            state.values.insert(
                (entity_type, entity_id, property_code.to_string()),
                value.map(str::to_string),
            );
        }
        Ok(())
    }

    async fn read_current_value(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self.value(entity_type, entity_id, property_code).await)
    }

    async fn delete_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        _actor: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !check_write(&state, property_code)? {
            return Ok(false);
        }
        Ok(state
            .values
            .remove(&(entity_type, entity_id, property_code.to_string()))
            .is_some())
    }

    async fn get_property_definitions(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<PropertyDefinition>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .definitions
            .iter()
            .filter(|d| d.entity_type == entity_type)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// AuditStore
// ---------------------------------------------------------------------------

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn write_audit(
        &self,
        entry: &AuditEntry,
        _actor: &str,
        _notes: Option<&str>,
        run_id: Option<DbId>,
    ) -> Result<DbId, StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_audit {
            return Err(StoreError::Unavailable("audit log is read-only".into()));
        }
        state.next_audit_id += 1;
        let id = state.next_audit_id;
        state.audit.push(AuditEntry {
            id: Some(id),
            run_id: run_id.or(entry.run_id),
            recorded_at: Some(Utc::now()),
            ..entry.clone()
        });
        Ok(id)
    }

    async fn get_audit_entry(&self, id: DbId) -> Result<Option<AuditEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.audit.iter().find(|e| e.id == Some(id)).cloned())
    }

    async fn get_repair_events(
        &self,
        filter: &RepairEventFilter,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn start_run(&self, mode: Mode, actor: &str) -> Result<DbId, StoreError> {
        let mut state = self.state.lock().await;
        state.next_run_id += 1;
        let id = state.next_run_id;
        state.runs.push(RunRecord {
            id,
            mode,
            actor: actor.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            violation_count: 0,
            repaired_count: 0,
        });
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: DbId,
        violation_count: usize,
        repaired_count: usize,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| StoreError::Backend(format!("repair run {run_id} not found")))?;
        run.completed_at = Some(Utc::now());
        run.violation_count = violation_count;
        run.repaired_count = repaired_count;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EntitySource
// ---------------------------------------------------------------------------

#[async_trait]
impl EntitySource for InMemoryStore {
    /// Registered entities with their extended maps refreshed from the
    /// current stored values.
    async fn load_entities(&self) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .entities
            .iter()
            .map(|entity| {
                let (entity_type, entity_id) = (entity.entity_type(), entity.entity_id());
                let mut entity = entity.clone();
                *entity.extended_mut() = state
                    .values
                    .iter()
                    .filter(|((t, id, _), _)| *t == entity_type && *id == entity_id)
                    .map(|((_, _, code), value)| (code.clone(), value.clone()))
                    .collect();
                entity
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Student;
    use crate::types::Severity;
    use assert_matches::assert_matches;

    fn student() -> Student {
        Student {
            id: 4,
            extended: [("Visa".to_string(), Some("f-1".to_string()))].into(),
            ..Student::default()
        }
    }

    #[tokio::test]
    async fn seeded_values_are_readable_and_reloaded() {
        let store = InMemoryStore::new().with_entity(student());
        assert_eq!(store.value(EntityType::Student, 4, "Visa").await.as_deref(), Some("f-1"));

        store
            .upsert_extended_property(EntityType::Student, 4, "Visa", Some("F1"), "t")
            .await
            .unwrap();
        let entities = store.load_entities().await.unwrap();
        assert_eq!(entities[0].extended_value("Visa"), Some("F1"));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = InMemoryStore::new().with_entity(student());
        assert!(store
            .delete_extended_property(EntityType::Student, 4, "Visa", "t")
            .await
            .unwrap());
        assert!(!store
            .delete_extended_property(EntityType::Student, 4, "Visa", "t")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn audit_ids_are_sequential_and_runs_complete() {
        let store = InMemoryStore::new();
        let entry = AuditEntry {
            id: None,
            run_id: None,
            rule_id: "R".into(),
            entity_type: EntityType::Student,
            entity_id: 4,
            property: "Visa".into(),
            before_value: None,
            after_value: Some("F1".into()),
            action: "repair:upsert".into(),
            severity: Severity::Error,
            recorded_at: None,
        };
        let run = store.start_run(Mode::Repair, "t").await.unwrap();
        assert_eq!(store.write_audit(&entry, "t", None, Some(run)).await.unwrap(), 1);
        assert_eq!(store.write_audit(&entry, "t", None, None).await.unwrap(), 2);

        let by_run = store
            .get_repair_events(&RepairEventFilter {
                run_id: Some(run),
                ..RepairEventFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_run.len(), 1);

        store.complete_run(run, 3, 1).await.unwrap();
        let runs = store.runs().await;
        assert!(runs[0].completed_at.is_some());
        assert_eq!(runs[0].repaired_count, 1);
        assert_matches!(store.complete_run(99, 0, 0).await, Err(StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn injected_faults_surface_as_store_errors() {
        let store = InMemoryStore::new().failing_writes_for("Visa");
        let err = store
            .upsert_extended_property(EntityType::Student, 4, "Visa", Some("F1"), "t")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Visa"));
    }
}
