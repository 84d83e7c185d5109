//! Revert engine: restores pre-repair values recorded in the audit trail.
//!
//! Each item runs `read → safety check → write → verify` as one sequential
//! unit:
//!
//! ```text
//! pending ──read──▶ verified ──write+verify──▶ reverted
//!    │                 │                    └─▶ failed
//!    │                 └─ mismatch, no force ─▶ skipped (safety)
//!    └─ dry run ─────────────────────────────▶ reverted (nothing written)
//! ```

use serde::Serialize;

use crate::audit::{is_revertible_action, AuditEntry, RepairEventFilter};
use crate::dates::{has_time_of_day, parse_datetime};
use crate::error::{CoreError, StoreError};
use crate::requirement::is_blank;
use crate::store::{is_date_property, AuditStore, PropertyStore};
use crate::types::DbId;

/// Reason reported when the current value no longer matches the repair.
pub const SAFETY_CHECK_FAILED: &str = "safety check failed";

/// Reason reported when the re-read after the write does not match.
pub const VERIFICATION_FAILED: &str = "verification failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertState {
    Pending,
    Verified,
    Reverted,
    SkippedSafety,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevertOptions {
    /// Proceed even when the safety check fails.
    pub force: bool,
    /// Report what would happen; never write. Skips the safety check.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevertOutcome {
    pub entry: AuditEntry,
    pub state: RevertState,
    /// Value found in the store before anything was written.
    pub current_value: Option<String>,
    /// Pre-repair value being restored.
    pub target_value: Option<String>,
    pub reason: Option<String>,
    pub dry_run: bool,
    /// Id of the `revert:restore` audit entry, when one was written.
    pub audit_id: Option<DbId>,
}

impl RevertOutcome {
    fn new(entry: &AuditEntry, dry_run: bool) -> Self {
        Self {
            entry: entry.clone(),
            state: RevertState::Pending,
            current_value: None,
            target_value: entry.before_value.clone(),
            reason: None,
            dry_run,
            audit_id: None,
        }
    }

    fn finish(mut self, state: RevertState, reason: Option<String>) -> Self {
        self.state = state;
        self.reason = reason;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevertBatchResult {
    pub outcomes: Vec<RevertOutcome>,
}

impl RevertBatchResult {
    pub fn reverted(&self) -> usize {
        self.count(RevertState::Reverted)
    }

    pub fn skipped(&self) -> usize {
        self.count(RevertState::SkippedSafety)
    }

    /// Safety skips count as failures alongside write and verification faults.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.reverted()
    }

    fn count(&self, state: RevertState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Type-aware equality used by the safety check and the verification.
///
/// Blank and absent are the same. For date-typed properties both sides are
/// parsed: when the expected value carries no time of day only the calendar
/// dates are compared, otherwise the full timestamps. Everything else, and
/// any date that fails to parse, compares as exact text.
pub fn values_equivalent(expected: Option<&str>, actual: Option<&str>, date_typed: bool) -> bool {
    match (is_blank(expected), is_blank(actual)) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }
    let (expected, actual) = (expected.unwrap_or_default(), actual.unwrap_or_default());
    if date_typed {
        if let (Some(e), Some(a)) = (parse_datetime(expected), parse_datetime(actual)) {
            return if has_time_of_day(&e) { e == a } else { e.date() == a.date() };
        }
    }
    expected == actual
}

pub struct RevertEngine<'a> {
    properties: &'a dyn PropertyStore,
    audit: &'a dyn AuditStore,
    actor: &'a str,
}

impl<'a> RevertEngine<'a> {
    pub fn new(properties: &'a dyn PropertyStore, audit: &'a dyn AuditStore, actor: &'a str) -> Self {
        Self {
            properties,
            audit,
            actor,
        }
    }

    /// Revert every repair event selected by `filter`.
    ///
    /// Entries are undone newest first so successive repairs of one property
    /// unwind back to the oldest pre-repair value. Fails only when the audit
    /// store cannot be queried.
    pub async fn revert_matching(
        &self,
        filter: &RepairEventFilter,
        options: RevertOptions,
    ) -> Result<RevertBatchResult, StoreError> {
        let entries = self.audit.get_repair_events(filter).await?;
        tracing::info!(candidates = entries.len(), dry_run = options.dry_run, force = options.force, "Reverting repair events");

        let mut result = RevertBatchResult::default();
        for entry in entries.iter().rev() {
            result.outcomes.push(self.revert_entry(entry, options).await);
        }
        tracing::info!(
            reverted = result.reverted(),
            skipped = result.skipped(),
            failed = result.failed(),
            "Revert batch complete"
        );
        Ok(result)
    }

    /// Revert a single audit entry by id.
    pub async fn revert_by_id(&self, audit_id: DbId, options: RevertOptions) -> Result<RevertOutcome, CoreError> {
        let entry = self
            .audit
            .get_audit_entry(audit_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "audit entry",
                id: audit_id,
            })?;
        if !is_revertible_action(&entry.action) {
            return Err(CoreError::Validation(format!(
                "Audit entry {audit_id} has action '{}' and cannot be reverted",
                entry.action
            )));
        }
        Ok(self.revert_entry(&entry, options).await)
    }

    /// Run the revert state machine for one entry.
    pub async fn revert_entry(&self, entry: &AuditEntry, options: RevertOptions) -> RevertOutcome {
        let outcome = RevertOutcome::new(entry, options.dry_run);

        let current = match self.read(entry).await {
            Ok(value) => value,
            Err(err) => return outcome.finish(RevertState::Failed, Some(format!("read failed: {err}"))),
        };
        let mut outcome = RevertOutcome {
            current_value: current.clone(),
            ..outcome
        };

        if options.dry_run {
            tracing::info!(
                entity_type = %entry.entity_type,
                entity_id = entry.entity_id,
                property = %entry.property,
                "Dry run: would restore pre-repair value"
            );
            return outcome.finish(RevertState::Reverted, Some("dry run".to_string()));
        }

        let date_typed = is_date_property(self.properties, entry.entity_type, &entry.property).await;

        if !values_equivalent(entry.after_value.as_deref(), current.as_deref(), date_typed) {
            if !options.force {
                tracing::warn!(
                    entity_type = %entry.entity_type,
                    entity_id = entry.entity_id,
                    property = %entry.property,
                    expected = ?entry.after_value,
                    actual = ?current,
                    "Revert skipped: value changed since repair"
                );
                return outcome.finish(RevertState::SkippedSafety, Some(SAFETY_CHECK_FAILED.to_string()));
            }
            tracing::warn!(
                entity_type = %entry.entity_type,
                entity_id = entry.entity_id,
                property = %entry.property,
                "Safety check failed; forcing revert"
            );
        }
        outcome.state = RevertState::Verified;

        let target = entry.before_value.as_deref().filter(|v| !v.trim().is_empty());
        if let Err(err) = self.write_target(entry, target).await {
            return outcome.finish(RevertState::Failed, Some(format!("write failed: {err}")));
        }

        match self.read(entry).await {
            Ok(after) if values_equivalent(target, after.as_deref(), date_typed) => {}
            Ok(after) => {
                tracing::warn!(
                    entity_type = %entry.entity_type,
                    entity_id = entry.entity_id,
                    property = %entry.property,
                    expected = ?target,
                    actual = ?after,
                    "Revert verification mismatch"
                );
                return outcome.finish(RevertState::Failed, Some(VERIFICATION_FAILED.to_string()));
            }
            Err(err) => {
                return outcome.finish(RevertState::Failed, Some(format!("verification read failed: {err}")))
            }
        }

        let restore = AuditEntry::for_revert(entry, current);
        match self.audit.write_audit(&restore, self.actor, None, entry.run_id).await {
            Ok(id) => outcome.audit_id = Some(id),
            Err(err) => tracing::error!(
                entity_type = %entry.entity_type,
                entity_id = entry.entity_id,
                property = %entry.property,
                error = %err,
                "Revert applied but audit write failed"
            ),
        }
        tracing::info!(
            entity_type = %entry.entity_type,
            entity_id = entry.entity_id,
            property = %entry.property,
            "Reverted extended property"
        );
        outcome.finish(RevertState::Reverted, None)
    }

    async fn read(&self, entry: &AuditEntry) -> Result<Option<String>, StoreError> {
        self.properties
            .read_current_value(entry.entity_type, entry.entity_id, &entry.property)
            .await
    }

    /// A blank target deletes the value; anything else is upserted.
    async fn write_target(&self, entry: &AuditEntry, target: Option<&str>) -> Result<(), StoreError> {
        match target {
            None => {
                let removed = self
                    .properties
                    .delete_extended_property(entry.entity_type, entry.entity_id, &entry.property, self.actor)
                    .await?;
                if !removed {
                    tracing::debug!(property = %entry.property, "Nothing to delete; value already absent");
                }
                Ok(())
            }
            Some(value) => {
                self.properties
                    .upsert_extended_property(
                        entry.entity_type,
                        entry.entity_id,
                        &entry.property,
                        Some(value),
                        self.actor,
                    )
                    .await
            }
        }
    }
}
