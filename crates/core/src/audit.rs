//! Repair audit entries and the filters used to select them.
//!
//! Entries are append-only: a revert writes a new `revert:restore` entry and
//! never edits the repair it undoes.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, EntityType, Severity, Timestamp};
use crate::violation::Violation;

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Audit action tags written by the repair and revert engines.
pub mod actions {
    pub const REPAIR_UPSERT: &str = "repair:upsert";
    /// A repair write that the property store rejected.
    pub const REPAIR_FAILED: &str = "repair:failed";
    pub const REVERT_RESTORE: &str = "revert:restore";
}

/// Whether an audit action records a successful repair that can be reverted.
pub fn is_revertible_action(action: &str) -> bool {
    action.starts_with("repair:") && action != actions::REPAIR_FAILED
}

// ---------------------------------------------------------------------------
// Audit entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the audit store on write.
    pub id: Option<DbId>,
    pub run_id: Option<DbId>,
    pub rule_id: String,
    pub entity_type: EntityType,
    pub entity_id: DbId,
    pub property: String,
    pub before_value: Option<String>,
    pub after_value: Option<String>,
    pub action: String,
    pub severity: Severity,
    pub recorded_at: Option<Timestamp>,
}

impl AuditEntry {
    /// Entry for an applied repair: before = current, after = proposed.
    pub fn for_repair(violation: &Violation) -> Self {
        Self {
            id: None,
            run_id: None,
            rule_id: violation.rule_id.clone(),
            entity_type: violation.entity_type,
            entity_id: violation.entity_id,
            property: violation.property.clone(),
            before_value: violation.current_value.clone(),
            after_value: violation.proposed_value.clone(),
            action: violation.action.clone(),
            severity: violation.severity,
            recorded_at: None,
        }
    }

    /// Entry for a repair the store rejected; the value did not change.
    pub fn for_failed_repair(violation: &Violation) -> Self {
        Self {
            action: actions::REPAIR_FAILED.to_string(),
            ..Self::for_repair(violation)
        }
    }

    /// New entry recording that `original` was reverted.
    ///
    /// `replaced` is the value found in the store before the restore.
    pub fn for_revert(original: &AuditEntry, replaced: Option<String>) -> Self {
        Self {
            id: None,
            run_id: original.run_id,
            rule_id: original.rule_id.clone(),
            entity_type: original.entity_type,
            entity_id: original.entity_id,
            property: original.property.clone(),
            before_value: replaced,
            after_value: original.before_value.clone(),
            action: actions::REVERT_RESTORE.to_string(),
            severity: original.severity,
            recorded_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Selection criteria for repair events. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairEventFilter {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub rule_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<DbId>,
    pub run_id: Option<DbId>,
}

impl RepairEventFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// In-process equivalent of the store query: revertible repair entries
    /// matching every set criterion. Entries without a timestamp never
    /// match a time bound.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if !is_revertible_action(&entry.action) {
            return false;
        }
        if let Some(from) = self.from {
            if !entry.recorded_at.is_some_and(|at| at >= from) {
                return false;
            }
        }
        if let Some(to) = self.to {
            if !entry.recorded_at.is_some_and(|at| at <= to) {
                return false;
            }
        }
        self.rule_id.as_ref().map_or(true, |r| r == &entry.rule_id)
            && self.entity_type.map_or(true, |t| t == entry.entity_type)
            && self.entity_id.map_or(true, |id| id == entry.entity_id)
            && self.run_id.map_or(true, |run| entry.run_id == Some(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;
    use chrono::{Duration, Utc};

    fn violation() -> Violation {
        Violation {
            rule_id: "visa".into(),
            entity_type: EntityType::Student,
            entity_id: 3,
            property: "Visa".into(),
            current_value: Some("f-1".into()),
            proposed_value: Some("F1".into()),
            reason: "in:F1|J1".into(),
            severity: Severity::Warning,
            action: "repair:upsert".into(),
            mode: Mode::Repair,
        }
    }

    #[test]
    fn repair_entry_captures_before_and_after() {
        let entry = AuditEntry::for_repair(&violation());
        assert_eq!(entry.before_value.as_deref(), Some("f-1"));
        assert_eq!(entry.after_value.as_deref(), Some("F1"));
        assert_eq!(entry.action, "repair:upsert");
    }

    #[test]
    fn revert_entry_swaps_direction() {
        let mut original = AuditEntry::for_repair(&violation());
        original.id = Some(10);
        original.run_id = Some(2);
        let revert = AuditEntry::for_revert(&original, Some("F1".into()));
        assert_eq!(revert.before_value.as_deref(), Some("F1"));
        assert_eq!(revert.after_value.as_deref(), Some("f-1"));
        assert_eq!(revert.action, actions::REVERT_RESTORE);
        assert_eq!(revert.id, None);
        assert_eq!(revert.run_id, Some(2));
    }

    #[test]
    fn failed_and_revert_entries_are_not_revertible() {
        assert!(is_revertible_action("repair:upsert"));
        assert!(!is_revertible_action(actions::REPAIR_FAILED));
        assert!(!is_revertible_action(actions::REVERT_RESTORE));
    }

    #[test]
    fn filter_matches_every_set_field() {
        let now = Utc::now();
        let mut entry = AuditEntry::for_repair(&violation());
        entry.run_id = Some(7);
        entry.recorded_at = Some(now);

        assert!(RepairEventFilter::default().matches(&entry));
        assert!(RepairEventFilter {
            from: Some(now - Duration::hours(1)),
            to: Some(now),
            rule_id: Some("visa".into()),
            entity_type: Some(EntityType::Student),
            entity_id: Some(3),
            run_id: Some(7),
        }
        .matches(&entry));
        assert!(!RepairEventFilter {
            run_id: Some(8),
            ..RepairEventFilter::default()
        }
        .matches(&entry));
        assert!(!RepairEventFilter {
            from: Some(now + Duration::seconds(1)),
            ..RepairEventFilter::default()
        }
        .matches(&entry));
    }
}
