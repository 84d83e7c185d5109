//! Loading and structural validation of rule documents.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

use super::model::RuleDocument;

/// Supplies a pre-validated rule document.
pub trait RuleSource: Send + Sync {
    fn load_rules(&self) -> Result<RuleDocument, CoreError>;
}

/// Parse and validate a JSON rule document.
pub fn load_from_str(json: &str) -> Result<RuleDocument, CoreError> {
    let document: RuleDocument =
        serde_json::from_str(json).map_err(|e| CoreError::InvalidRules(e.to_string()))?;
    validate_document(&document)?;
    Ok(document)
}

/// Read, parse and validate a JSON rule document from disk.
pub fn load_from_path(path: &Path) -> Result<RuleDocument, CoreError> {
    let json = std::fs::read_to_string(path).map_err(|source| CoreError::RulesIo {
        path: path.display().to_string(),
        source,
    })?;
    load_from_str(&json)
}

/// Check the structural invariants every pass relies on.
///
/// All problems are collected and reported together.
pub fn validate_document(document: &RuleDocument) -> Result<(), CoreError> {
    let mut problems = Vec::new();

    if document.ruleset.id.trim().is_empty() {
        problems.push("ruleset id must not be empty".to_string());
    }
    if document.ruleset.name.trim().is_empty() {
        problems.push("ruleset name must not be empty".to_string());
    }
    if document.rules.is_empty() {
        problems.push("ruleset must contain at least one rule".to_string());
    }

    let mut seen_ids = HashSet::new();
    for (index, rule) in document.rules.iter().enumerate() {
        let label = if rule.id.trim().is_empty() {
            problems.push(format!("rule #{index} has no id"));
            format!("#{index}")
        } else {
            if !seen_ids.insert(rule.id.as_str()) {
                problems.push(format!("duplicate rule id '{}'", rule.id));
            }
            format!("'{}'", rule.id)
        };
        if rule.scope.trim().is_empty() {
            problems.push(format!("rule {label} has no scope"));
        }
        if rule.requirements.is_empty() {
            problems.push(format!("rule {label} has no requirements"));
        }
        for (req_index, requirement) in rule.requirements.iter().enumerate() {
            if requirement.property.trim().is_empty() {
                problems.push(format!("rule {label} requirement #{req_index} has no property"));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::InvalidRules(problems.join("; ")))
    }
}

/// Rule source backed by a JSON file, re-read on every load.
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileRuleSource {
    fn load_rules(&self) -> Result<RuleDocument, CoreError> {
        let document = load_from_path(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            ruleset = %document.ruleset.id,
            rules = document.rules.len(),
            "Loaded rule document"
        );
        Ok(document)
    }
}

/// Rule source over an already-loaded document.
#[derive(Debug, Clone)]
pub struct StaticRuleSource(pub RuleDocument);

impl RuleSource for StaticRuleSource {
    fn load_rules(&self) -> Result<RuleDocument, CoreError> {
        validate_document(&self.0)?;
        Ok(self.0.clone())
    }
}
