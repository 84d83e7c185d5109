//! Adapters implementing the `extprop-core` store traits on Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use extprop_core::audit::{AuditEntry, RepairEventFilter};
use extprop_core::entity::{Entity, ExtendedProperties};
use extprop_core::error::StoreError;
use extprop_core::store::{AuditStore, EntitySource, PropertyDefinition, PropertyStore};
use extprop_core::types::{DbId, EntityType, Mode};

use crate::models::property::PropertyValueRow;
use crate::models::repair::NewRepairAudit;
use crate::repositories::{
    DocumentRepo, PropertyDefinitionRepo, PropertyValueRepo, RepairAuditRepo, RepairRunRepo,
    StudentRepo,
};
use crate::DbPool;

/// Map a sqlx error onto the collaborator fault the engines understand.
///
/// Connection-level failures are `Unavailable`; everything else is `Backend`.
pub fn backend(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Group value rows into one extended map per entity id.
fn group_values(rows: Vec<PropertyValueRow>) -> HashMap<DbId, ExtendedProperties> {
    let mut grouped: HashMap<DbId, ExtendedProperties> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.entity_id)
            .or_default()
            .insert(row.property_code, row.value);
    }
    grouped
}

/// Postgres-backed property, audit and entity store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// PropertyStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PropertyStore for PgStore {
    async fn upsert_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        value: Option<&str>,
        actor: &str,
    ) -> Result<(), StoreError> {
        PropertyValueRepo::upsert(&self.pool, entity_type.as_str(), entity_id, property_code, value, actor)
            .await
            .map_err(backend)
    }

    async fn read_current_value(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
    ) -> Result<Option<String>, StoreError> {
        PropertyValueRepo::find_value(&self.pool, entity_type.as_str(), entity_id, property_code)
            .await
            .map_err(backend)
    }

    async fn delete_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        actor: &str,
    ) -> Result<bool, StoreError> {
        let removed = PropertyValueRepo::delete(&self.pool, entity_type.as_str(), entity_id, property_code)
            .await
            .map_err(backend)?;
        tracing::debug!(%entity_type, entity_id, property = %property_code, actor, removed, "Deleted extended property");
        Ok(removed)
    }

    async fn get_property_definitions(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<PropertyDefinition>, StoreError> {
        let rows = PropertyDefinitionRepo::list_by_entity_type(&self.pool, entity_type.as_str())
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|row| PropertyDefinition::try_from(row).map_err(|e| StoreError::Backend(e.to_string())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// AuditStore
// ---------------------------------------------------------------------------

#[async_trait]
impl AuditStore for PgStore {
    async fn write_audit(
        &self,
        entry: &AuditEntry,
        actor: &str,
        notes: Option<&str>,
        run_id: Option<DbId>,
    ) -> Result<DbId, StoreError> {
        let input = NewRepairAudit {
            entry,
            run_id: run_id.or(entry.run_id),
            actor,
            notes,
        };
        RepairAuditRepo::insert(&self.pool, &input).await.map_err(backend)
    }

    async fn get_audit_entry(&self, id: DbId) -> Result<Option<AuditEntry>, StoreError> {
        let row = RepairAuditRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?;
        row.map(AuditEntry::try_from)
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn get_repair_events(
        &self,
        filter: &RepairEventFilter,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = RepairAuditRepo::list_repair_events(&self.pool, filter)
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|row| AuditEntry::try_from(row).map_err(|e| StoreError::Backend(e.to_string())))
            .collect()
    }

    async fn start_run(&self, mode: Mode, actor: &str) -> Result<DbId, StoreError> {
        RepairRunRepo::start(&self.pool, mode.as_str(), actor)
            .await
            .map_err(backend)
    }

    async fn complete_run(
        &self,
        run_id: DbId,
        violation_count: usize,
        repaired_count: usize,
    ) -> Result<(), StoreError> {
        let updated = RepairRunRepo::complete(&self.pool, run_id, count(violation_count), count(repaired_count))
            .await
            .map_err(backend)?;
        if !updated {
            return Err(StoreError::Backend(format!("repair run {run_id} not found")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EntitySource
// ---------------------------------------------------------------------------

#[async_trait]
impl EntitySource for PgStore {
    /// Every student (with its documents nested) followed by every document.
    async fn load_entities(&self) -> Result<Vec<Entity>, StoreError> {
        let students = StudentRepo::list_all(&self.pool).await.map_err(backend)?;
        let documents = DocumentRepo::list_all(&self.pool).await.map_err(backend)?;
        let mut student_values = group_values(
            PropertyValueRepo::list_by_entity_type(&self.pool, EntityType::Student.as_str())
                .await
                .map_err(backend)?,
        );
        let mut document_values = group_values(
            PropertyValueRepo::list_by_entity_type(&self.pool, EntityType::Document.as_str())
                .await
                .map_err(backend)?,
        );

        let documents: Vec<_> = documents
            .into_iter()
            .map(|row| {
                let extended = document_values.remove(&row.id).unwrap_or_default();
                row.into_document(extended)
            })
            .collect();

        let mut by_student: HashMap<DbId, Vec<_>> = HashMap::new();
        for doc in &documents {
            if let Some(student_id) = doc.student_id {
                by_student.entry(student_id).or_default().push(doc.clone());
            }
        }

        let mut entities: Vec<Entity> = students
            .into_iter()
            .map(|row| {
                let docs = by_student.remove(&row.id).unwrap_or_default();
                let extended = student_values.remove(&row.id).unwrap_or_default();
                Entity::Student(row.into_student(docs, extended))
            })
            .collect();
        entities.extend(documents.into_iter().map(Entity::Document));

        tracing::debug!(entities = entities.len(), "Loaded entity snapshot");
        Ok(entities)
    }
}
