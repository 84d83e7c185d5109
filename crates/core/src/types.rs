//! Scalar aliases and the small enums shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// The kinds of entity that carry extended properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(alias = "student")]
    Student,
    #[serde(alias = "document")]
    Document,
}

const VALID_ENTITY_TYPES: &[&str] = &["Student", "Document"];

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Document => "Document",
        }
    }

    /// Parse an entity type, ignoring ASCII case.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("student") {
            Ok(Self::Student)
        } else if s.eq_ignore_ascii_case("document") {
            Ok(Self::Document)
        } else {
            Err(CoreError::Validation(format!(
                "Invalid entity type '{s}'. Must be one of: {}",
                VALID_ENTITY_TYPES.join(", ")
            )))
        }
    }

    /// Whether a rule `scope` string targets this entity type.
    pub fn matches_scope(&self, scope: &str) -> bool {
        scope.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Evaluation intent for a rule or a whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report only.
    #[default]
    Validate,
    /// Report and compute a proposed repair, never write.
    Simulate,
    /// Report, compute and write.
    Repair,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Simulate => "simulate",
            Self::Repair => "repair",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "validate" => Ok(Self::Validate),
            "simulate" => Ok(Self::Simulate),
            "repair" => Ok(Self::Repair),
            other => Err(CoreError::Validation(format!(
                "Invalid mode '{other}'. Must be one of: validate, simulate, repair"
            ))),
        }
    }

    /// Whether failures under this mode get a derived proposal and a repair action.
    pub fn proposes_repairs(&self) -> bool {
        matches!(self, Self::Simulate | Self::Repair)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity tiers, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    /// Hardcoded fallback at the end of the precedence chain.
    #[default]
    Error,
    /// Maximum tier. Violations at this tier are never auto-repaired.
    Block,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Block => "block",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "block" => Ok(Self::Block),
            other => Err(CoreError::Validation(format!(
                "Invalid severity '{other}'. Must be one of: info, warning, error, block"
            ))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Declared data type
// ---------------------------------------------------------------------------

/// Declared type of an extended property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    #[serde(alias = "text")]
    String,
    #[serde(alias = "int", alias = "integer", alias = "decimal")]
    Number,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "datetime")]
    Date,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Date => "date",
        }
    }

    /// Lenient parse used for store-provided definitions; unknown names are strings.
    pub fn from_store(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" | "int" | "integer" | "decimal" => Self::Number,
            "bool" | "boolean" => Self::Bool,
            "date" | "datetime" => Self::Date,
            _ => Self::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_parses_case_insensitively() {
        assert_eq!(EntityType::from_str("STUDENT").unwrap(), EntityType::Student);
        assert_eq!(EntityType::from_str(" document ").unwrap(), EntityType::Document);
        assert!(EntityType::from_str("course").is_err());
    }

    #[test]
    fn scope_matching_ignores_case() {
        assert!(EntityType::Student.matches_scope("student"));
        assert!(!EntityType::Student.matches_scope("Document"));
    }

    #[test]
    fn severity_ordering_puts_block_last() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Error < Severity::Block);
        assert_eq!(Severity::default(), Severity::Error);
    }

    #[test]
    fn mode_defaults_to_validate() {
        assert_eq!(Mode::default(), Mode::Validate);
        assert!(!Mode::Validate.proposes_repairs());
        assert!(Mode::Simulate.proposes_repairs());
    }

    #[test]
    fn data_type_deserializes_aliases() {
        let t: DataType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(t, DataType::Date);
        let t: DataType = serde_json::from_str("\"int\"").unwrap();
        assert_eq!(t, DataType::Number);
        assert_eq!(DataType::from_store("Boolean"), DataType::Bool);
        assert_eq!(DataType::from_store("varchar"), DataType::String);
    }
}
