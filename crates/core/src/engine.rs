//! Rule engine: evaluates entities against a rule document into violations.

use crate::condition;
use crate::derive::derive_value;
use crate::entity::{EntityProjection, JsonView};
use crate::normalize::normalize;
use crate::requirement::check;
use crate::rules::{Requirement, Rule, RuleDocument};
use crate::types::{Mode, Severity};
use crate::violation::{Violation, ACTION_NONE, DEFAULT_REPAIR_ACTION, REPAIR_ACTION_PREFIX};

/// Caller-side knobs for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Overrides every rule's mode, e.g. to dry-run a repair document as `simulate`.
    pub forced_mode: Option<Mode>,
}

/// Stateless evaluator over a borrowed, immutable rule document.
///
/// Entities are independent of each other, so callers may fan
/// [`RuleEngine::evaluate_entity`] out across threads.
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    document: &'a RuleDocument,
    options: EvaluationOptions,
}

impl<'a> RuleEngine<'a> {
    pub fn new(document: &'a RuleDocument) -> Self {
        Self {
            document,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(document: &'a RuleDocument, options: EvaluationOptions) -> Self {
        Self { document, options }
    }

    /// Forced mode, then the rule's mode, then the document default, then `validate`.
    pub fn effective_mode(&self, rule: &Rule) -> Mode {
        self.options
            .forced_mode
            .or(rule.mode)
            .or(self.document.defaults.mode)
            .unwrap_or_default()
    }

    /// Mode of the pass as a whole, ignoring per-rule overrides.
    pub fn pass_mode(&self) -> Mode {
        self.options
            .forced_mode
            .or(self.document.defaults.mode)
            .unwrap_or_default()
    }

    /// Requirement, then rule group, then document default, then [`Severity::Error`].
    pub fn resolve_severity(&self, rule: &Rule, requirement: &Requirement) -> Severity {
        requirement
            .on_failure
            .as_ref()
            .and_then(|f| f.severity)
            .or_else(|| rule.on_group_failure.as_ref().and_then(|g| g.severity))
            .or(self.document.defaults.severity)
            .unwrap_or_default()
    }

    /// Evaluate every entity in order.
    pub fn evaluate<E: EntityProjection>(&self, entities: &[E]) -> Vec<Violation> {
        entities
            .iter()
            .flat_map(|entity| self.evaluate_entity(entity))
            .collect()
    }

    /// Evaluate one entity against every rule in document order.
    ///
    /// The entity is serialized once; conditions and derivations resolve
    /// their paths against that view.
    pub fn evaluate_entity<E: EntityProjection + ?Sized>(&self, entity: &E) -> Vec<Violation> {
        let entity = &JsonView::new(entity);
        let entity_type = entity.entity_type();
        let mut violations = Vec::new();

        for rule in &self.document.rules {
            if !rule.applies_to(entity_type) {
                continue;
            }
            if !condition::applies(rule.when.as_ref(), entity) {
                tracing::trace!(rule_id = %rule.id, entity_id = entity.entity_id(), "Rule condition not met");
                continue;
            }
            let mode = self.effective_mode(rule);
            for requirement in &rule.requirements {
                if let Some(violation) = self.check_requirement(rule, requirement, mode, entity) {
                    violations.push(violation);
                }
            }
        }
        violations
    }

    fn check_requirement<E: EntityProjection + ?Sized>(
        &self,
        rule: &Rule,
        requirement: &Requirement,
        mode: Mode,
        entity: &E,
    ) -> Option<Violation> {
        let current = entity.extended_value(&requirement.property);
        let normalized = normalize(current, requirement.normalize.as_ref(), requirement.data_type);
        let outcome = check(requirement, normalized.as_deref());
        if outcome.passed {
            return None;
        }

        let severity = self.resolve_severity(rule, requirement);
        let (proposed, action) = if mode.proposes_repairs() {
            let proposed = derive_value(requirement, entity).or_else(|| normalized.clone());
            (proposed, repair_action(requirement))
        } else {
            (normalized.clone(), ACTION_NONE.to_string())
        };

        tracing::debug!(
            rule_id = %rule.id,
            entity_type = %entity.entity_type(),
            entity_id = entity.entity_id(),
            property = %requirement.property,
            reason = %outcome.reason,
            %severity,
            %mode,
            "Requirement failed"
        );

        Some(Violation {
            rule_id: rule.id.clone(),
            entity_type: entity.entity_type(),
            entity_id: entity.entity_id(),
            property: requirement.property.clone(),
            current_value: current.map(str::to_string),
            proposed_value: proposed,
            reason: outcome.reason,
            severity,
            action,
            mode,
        })
    }
}

/// First configured `repair:` action, else the default upsert.
fn repair_action(requirement: &Requirement) -> String {
    requirement
        .on_failure
        .as_ref()
        .and_then(|f| f.actions.iter().find(|a| a.starts_with(REPAIR_ACTION_PREFIX)))
        .cloned()
        .unwrap_or_else(|| DEFAULT_REPAIR_ACTION.to_string())
}
