//! Repository for the append-only `repair_audit` table.

use extprop_core::audit::{actions, RepairEventFilter};
use extprop_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::repair::{NewRepairAudit, RepairAuditRow};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `repair_audit` SELECT queries.
const COLUMNS: &str = "\
    id, run_id, rule_id, entity_type, entity_id, property_code, \
    before_value, after_value, action, severity, actor, notes, recorded_at";

/// Column list for INSERT (excludes auto-generated `id` and `recorded_at`).
const INSERT_COLUMNS: &str = "\
    run_id, rule_id, entity_type, entity_id, property_code, \
    before_value, after_value, action, severity, actor, notes";

// ---------------------------------------------------------------------------
// RepairAuditRepo
// ---------------------------------------------------------------------------

pub struct RepairAuditRepo;

impl RepairAuditRepo {
    /// Append one entry, returning its id.
    pub async fn insert(pool: &PgPool, input: &NewRepairAudit<'_>) -> Result<DbId, sqlx::Error> {
        let entry = input.entry;
        let query = format!(
            "INSERT INTO repair_audit ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id"
        );
        sqlx::query_scalar::<_, DbId>(&query)
            .bind(input.run_id)
            .bind(&entry.rule_id)
            .bind(entry.entity_type.as_str())
            .bind(entry.entity_id)
            .bind(&entry.property)
            .bind(&entry.before_value)
            .bind(&entry.after_value)
            .bind(&entry.action)
            .bind(entry.severity.as_str())
            .bind(input.actor)
            .bind(input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RepairAuditRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repair_audit WHERE id = $1");
        sqlx::query_as::<_, RepairAuditRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Revertible repair entries matching `filter`, oldest first.
    pub async fn list_repair_events(
        pool: &PgPool,
        filter: &RepairEventFilter,
    ) -> Result<Vec<RepairAuditRow>, sqlx::Error> {
        let (where_clause, bind_values) = build_repair_event_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM repair_audit {where_clause} ORDER BY recorded_at ASC, id ASC"
        );
        bind_values
            .iter()
            .fold(sqlx::query_as::<_, RepairAuditRow>(&query), |q, val| match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            })
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Filter building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built repair event queries.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Build the WHERE clause for a repair event query.
///
/// Always restricts to successful `repair:*` actions; each set filter field
/// adds one numbered placeholder.
fn build_repair_event_filter(filter: &RepairEventFilter) -> (String, Vec<BindValue>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<BindValue> = Vec::new();

    conditions.push(format!("action LIKE ${}", bind_values.len() + 1));
    bind_values.push(BindValue::Text("repair:%".into()));
    conditions.push(format!("action <> ${}", bind_values.len() + 1));
    bind_values.push(BindValue::Text(actions::REPAIR_FAILED.into()));

    if let Some(from) = filter.from {
        conditions.push(format!("recorded_at >= ${}", bind_values.len() + 1));
        bind_values.push(BindValue::Timestamp(from));
    }
    if let Some(to) = filter.to {
        conditions.push(format!("recorded_at <= ${}", bind_values.len() + 1));
        bind_values.push(BindValue::Timestamp(to));
    }
    if let Some(ref rule_id) = filter.rule_id {
        conditions.push(format!("rule_id = ${}", bind_values.len() + 1));
        bind_values.push(BindValue::Text(rule_id.clone()));
    }
    if let Some(entity_type) = filter.entity_type {
        conditions.push(format!("entity_type = ${}", bind_values.len() + 1));
        bind_values.push(BindValue::Text(entity_type.as_str().into()));
    }
    if let Some(entity_id) = filter.entity_id {
        conditions.push(format!("entity_id = ${}", bind_values.len() + 1));
        bind_values.push(BindValue::BigInt(entity_id));
    }
    if let Some(run_id) = filter.run_id {
        conditions.push(format!("run_id = ${}", bind_values.len() + 1));
        bind_values.push(BindValue::BigInt(run_id));
    }

    (format!("WHERE {}", conditions.join(" AND ")), bind_values)
}
