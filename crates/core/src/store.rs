//! Collaborator contracts for the external property, audit and entity stores.
//!
//! Implementations live outside the engine: [`crate::memory`] for tests and
//! offline runs, `extprop-db` for Postgres.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEntry, RepairEventFilter};
use crate::entity::Entity;
use crate::error::StoreError;
use crate::types::{DataType, DbId, EntityType, Mode};

/// Definition of one extended property for an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub entity_type: EntityType,
    pub property_code: String,
    pub data_type: DataType,
    pub label: Option<String>,
}

/// Reads and writes extended-property values.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn upsert_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        value: Option<&str>,
        actor: &str,
    ) -> Result<(), StoreError>;

    async fn read_current_value(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Remove the value entirely. `false` when there was nothing to remove.
    async fn delete_extended_property(
        &self,
        entity_type: EntityType,
        entity_id: DbId,
        property_code: &str,
        actor: &str,
    ) -> Result<bool, StoreError>;

    async fn get_property_definitions(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<PropertyDefinition>, StoreError>;
}

/// Append-only audit trail plus run bookkeeping.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist `entry`, returning the assigned id.
    async fn write_audit(
        &self,
        entry: &AuditEntry,
        actor: &str,
        notes: Option<&str>,
        run_id: Option<DbId>,
    ) -> Result<DbId, StoreError>;

    async fn get_audit_entry(&self, id: DbId) -> Result<Option<AuditEntry>, StoreError>;

    /// Revertible repair entries matching `filter`, oldest first.
    async fn get_repair_events(
        &self,
        filter: &RepairEventFilter,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    async fn start_run(&self, mode: Mode, actor: &str) -> Result<DbId, StoreError>;

    async fn complete_run(
        &self,
        run_id: DbId,
        violation_count: usize,
        repaired_count: usize,
    ) -> Result<(), StoreError>;
}

/// Supplies entity snapshots for a pass.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn load_entities(&self) -> Result<Vec<Entity>, StoreError>;
}

/// Whether `property_code` is declared as a date for its entity type.
///
/// Codes compare ignoring case. A failed lookup counts as "not a date" so
/// the caller falls back to exact comparison.
pub async fn is_date_property<P: PropertyStore + ?Sized>(
    store: &P,
    entity_type: EntityType,
    property_code: &str,
) -> bool {
    match store.get_property_definitions(entity_type).await {
        Ok(definitions) => definitions.iter().any(|d| {
            d.property_code.eq_ignore_ascii_case(property_code) && d.data_type == DataType::Date
        }),
        Err(err) => {
            tracing::warn!(
                %entity_type,
                property = %property_code,
                error = %err,
                "Property definitions unavailable; comparing values exactly"
            );
            false
        }
    }
}
