//! Repair audit rows (append-only, no `updated_at`).

use extprop_core::audit::AuditEntry;
use extprop_core::error::CoreError;
use extprop_core::types::{DbId, EntityType, Severity, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RepairAuditRow {
    pub id: DbId,
    pub run_id: Option<DbId>,
    pub rule_id: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub property_code: String,
    pub before_value: Option<String>,
    pub after_value: Option<String>,
    pub action: String,
    pub severity: String,
    pub actor: String,
    pub notes: Option<String>,
    pub recorded_at: Timestamp,
}

impl TryFrom<RepairAuditRow> for AuditEntry {
    type Error = CoreError;

    fn try_from(row: RepairAuditRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Some(row.id),
            run_id: row.run_id,
            rule_id: row.rule_id,
            entity_type: EntityType::from_str(&row.entity_type)?,
            entity_id: row.entity_id,
            property: row.property_code,
            before_value: row.before_value,
            after_value: row.after_value,
            action: row.action,
            severity: Severity::from_str(&row.severity)?,
            recorded_at: Some(row.recorded_at),
        })
    }
}

/// Insert DTO for `repair_audit`.
#[derive(Debug, Clone)]
pub struct NewRepairAudit<'a> {
    pub entry: &'a AuditEntry,
    pub run_id: Option<DbId>,
    pub actor: &'a str,
    pub notes: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn row() -> RepairAuditRow {
        RepairAuditRow {
            id: 9,
            run_id: Some(2),
            rule_id: "visa".into(),
            entity_type: "Student".into(),
            entity_id: 1,
            property_code: "Visa".into(),
            before_value: None,
            after_value: Some("F1".into()),
            action: "repair:upsert".into(),
            severity: "warning".into(),
            actor: "extprop".into(),
            notes: None,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn audit_row_converts_to_entry() {
        let entry = AuditEntry::try_from(row()).unwrap();
        assert_eq!(entry.id, Some(9));
        assert_eq!(entry.entity_type, EntityType::Student);
        assert_eq!(entry.severity, Severity::Warning);
        assert_eq!(entry.property, "Visa");
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        let mut bad = row();
        bad.entity_type = "Course".into();
        assert_matches!(AuditEntry::try_from(bad), Err(CoreError::Validation(_)));
    }
}
