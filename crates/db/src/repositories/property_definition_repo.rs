//! Repository for the `extended_property_definitions` table.

use sqlx::PgPool;

use crate::models::property::PropertyDefinitionRow;

/// Column list for `extended_property_definitions` SELECT queries.
const COLUMNS: &str = "id, entity_type, property_code, data_type, label, created_at";

pub struct PropertyDefinitionRepo;

impl PropertyDefinitionRepo {
    /// All definitions for one entity type, ordered by code.
    pub async fn list_by_entity_type(
        pool: &PgPool,
        entity_type: &str,
    ) -> Result<Vec<PropertyDefinitionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM extended_property_definitions \
             WHERE entity_type = $1 ORDER BY property_code"
        );
        sqlx::query_as::<_, PropertyDefinitionRow>(&query)
            .bind(entity_type)
            .fetch_all(pool)
            .await
    }
}
