//! Repository for the `extended_property_values` table.

use extprop_core::types::DbId;
use sqlx::PgPool;

use crate::models::property::PropertyValueRow;

/// Column list for `extended_property_values` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, property_code, value, updated_by, updated_at";

/// Provides read, upsert and delete operations on extended-property values.
pub struct PropertyValueRepo;

impl PropertyValueRepo {
    /// Insert or overwrite the value for one `(entity, property)` pair.
    pub async fn upsert(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        property_code: &str,
        value: Option<&str>,
        actor: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO extended_property_values \
                (entity_type, entity_id, property_code, value, updated_by) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (entity_type, entity_id, property_code) \
             DO UPDATE SET value = EXCLUDED.value, \
                           updated_by = EXCLUDED.updated_by, \
                           updated_at = now()",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(property_code)
        .bind(value)
        .bind(actor)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Current value, `None` when the row is missing or its value is `NULL`.
    pub async fn find_value(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        property_code: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT value FROM extended_property_values \
             WHERE entity_type = $1 AND entity_id = $2 AND property_code = $3",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(property_code)
        .fetch_optional(pool)
        .await
        .map(Option::flatten)
    }

    /// Remove the row. Returns `true` if a row was deleted.
    pub async fn delete(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        property_code: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM extended_property_values \
             WHERE entity_type = $1 AND entity_id = $2 AND property_code = $3",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(property_code)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every value row for one entity type, ordered for grouping by entity.
    pub async fn list_by_entity_type(
        pool: &PgPool,
        entity_type: &str,
    ) -> Result<Vec<PropertyValueRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM extended_property_values \
             WHERE entity_type = $1 ORDER BY entity_id, property_code"
        );
        sqlx::query_as::<_, PropertyValueRow>(&query)
            .bind(entity_type)
            .fetch_all(pool)
            .await
    }
}
