//! Rule document types. Immutable once loaded.

use serde::Deserialize;
use serde_json::Value;

use crate::condition::{self, Condition};
use crate::normalize::NormalizeSpec;
use crate::pattern::Pattern;
use crate::types::{DataType, EntityType, Mode, Severity};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    pub ruleset: RulesetInfo,
    #[serde(default)]
    pub defaults: RuleDefaults,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleDefaults {
    pub mode: Option<Mode>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Entity type this rule targets, matched ignoring case.
    pub scope: String,
    #[serde(default, deserialize_with = "condition::deserialize_optional")]
    pub when: Option<Condition>,
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub on_group_failure: Option<GroupFailurePolicy>,
}

impl Rule {
    pub fn applies_to(&self, entity_type: EntityType) -> bool {
        entity_type.matches_scope(&self.scope)
    }
}

/// Rule-level failure policy; its severity sits between the requirement's
/// own severity and the document default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupFailurePolicy {
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub property: String,
    #[serde(default, rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub normalize: Option<NormalizeSpec>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub on_failure: Option<OnFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnFailure {
    pub severity: Option<Severity>,
    /// Action tags, e.g. `repair:upsert`, `notify:registrar`.
    pub actions: Vec<String>,
}

/// Constraint block, evaluated in field order; the first failure wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    pub regex: Option<Pattern>,
    pub eq: Option<Value>,
    pub neq: Option<Value>,
    #[serde(rename = "in")]
    pub in_set: Option<Vec<Value>>,
    pub any_of: Option<Vec<Value>>,
    pub none_of: Option<Vec<Value>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub gte: Option<Value>,
    pub lte: Option<Value>,
}

/// Ordered derivation candidates for a repair proposal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub kind: CandidateKind,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateKind {
    Literal,
    Path,
    /// Kinds such as lookups or computed values are recognised by name but
    /// not implemented; the deriver skips them.
    #[serde(other)]
    Reserved,
}
