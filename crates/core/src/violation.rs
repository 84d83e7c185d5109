//! Violations: one per failed requirement, never mutated after creation.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, EntityType, Mode, Severity};

/// Action tag for violations reported in `validate` mode.
pub const ACTION_NONE: &str = "none";

/// Fallback repair action when a requirement configures none.
pub const DEFAULT_REPAIR_ACTION: &str = "repair:upsert";

/// Prefix shared by every repair action tag.
pub const REPAIR_ACTION_PREFIX: &str = "repair:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub entity_type: EntityType,
    pub entity_id: DbId,
    pub property: String,
    pub current_value: Option<String>,
    pub proposed_value: Option<String>,
    pub reason: String,
    pub severity: Severity,
    pub action: String,
    /// Effective mode of the rule that produced this violation.
    pub mode: Mode,
}

impl Violation {
    /// Whether the repair engine may write the proposed value.
    ///
    /// Requires a repair action, a non-blank proposal and a severity below
    /// [`Severity::Block`].
    pub fn is_repairable(&self) -> bool {
        self.action.contains("repair")
            && self
                .proposed_value
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty())
            && self.severity < Severity::Block
    }
}
