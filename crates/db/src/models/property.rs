//! Extended property definition and value rows.

use extprop_core::error::CoreError;
use extprop_core::store::PropertyDefinition;
use extprop_core::types::{DataType, DbId, EntityType, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PropertyDefinitionRow {
    pub id: DbId,
    pub entity_type: String,
    pub property_code: String,
    pub data_type: String,
    pub label: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<PropertyDefinitionRow> for PropertyDefinition {
    type Error = CoreError;

    fn try_from(row: PropertyDefinitionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            entity_type: EntityType::from_str(&row.entity_type)?,
            property_code: row.property_code,
            // Unknown type names are treated as plain strings.
            data_type: DataType::from_store(&row.data_type),
            label: row.label,
        })
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// One stored extended-property value. A `NULL` value is a present but
/// empty property; an absent row is an unset property.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PropertyValueRow {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub property_code: String,
    pub value: Option<String>,
    pub updated_by: String,
    pub updated_at: Timestamp,
}
