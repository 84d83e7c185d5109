//! Normalization of current values and coercion of derived values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates;
use crate::path::scalar_text;
use crate::types::DataType;

/// Default character for left-padding.
pub const DEFAULT_PAD_CHAR: char = '0';

/// Tokens accepted as `true` when coercing to a boolean.
const TRUE_TOKENS: &[&str] = &["true", "1", "y", "yes"];

/// Per-requirement normalization steps. Every step is optional; enabled
/// steps run in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizeSpec {
    pub trim: bool,
    pub uppercase: bool,
    /// Target width for left-padding.
    pub pad_left: Option<usize>,
    pub pad_char: Option<char>,
    pub bool_literals: Option<BoolLiterals>,
    /// Re-emit parseable dates as `yyyy-MM-dd` (date-typed requirements only).
    pub iso_date: bool,
}

/// Literal sets mapped to canonical `"true"` / `"false"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoolLiterals {
    pub truthy: Vec<String>,
    pub falsy: Vec<String>,
}

fn contains_ignore_case(set: &[String], value: &str) -> bool {
    set.iter().any(|literal| literal.eq_ignore_ascii_case(value))
}

/// Apply `spec` to `value`. Without a spec, or for an absent value, the
/// input is returned unchanged.
pub fn normalize(value: Option<&str>, spec: Option<&NormalizeSpec>, data_type: DataType) -> Option<String> {
    let mut out = value?.to_string();
    let Some(spec) = spec else {
        return Some(out);
    };

    if spec.trim {
        out = out.trim().to_string();
    }
    if spec.uppercase {
        out = out.to_uppercase();
    }
    if let Some(width) = spec.pad_left {
        let len = out.chars().count();
        // Blank values stay blank so `required` still sees them.
        if !out.is_empty() && len < width {
            let pad = spec.pad_char.unwrap_or(DEFAULT_PAD_CHAR);
            out = std::iter::repeat(pad).take(width - len).chain(out.chars()).collect();
        }
    }
    if let Some(literals) = &spec.bool_literals {
        let probe = out.trim();
        if contains_ignore_case(&literals.truthy, probe) {
            out = "true".to_string();
        } else if contains_ignore_case(&literals.falsy, probe) {
            out = "false".to_string();
        }
    }
    if spec.iso_date && data_type == DataType::Date {
        if let Some(iso) = dates::to_iso_date(&out) {
            out = iso;
        }
    }
    Some(out)
}

/// Convert a raw derived value to canonical text for `data_type`.
pub fn coerce(raw: &Value, data_type: DataType) -> Option<String> {
    match data_type {
        DataType::Date => {
            let text = scalar_text(raw)?;
            Some(dates::to_iso_date(&text).unwrap_or(text))
        }
        DataType::Bool => {
            let truthy = match raw {
                Value::Null => return None,
                Value::Bool(b) => *b,
                other => {
                    let text = scalar_text(other)?;
                    let text = text.trim();
                    TRUE_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(text))
                }
            };
            Some(truthy.to_string())
        }
        DataType::String | DataType::Number => scalar_text(raw),
    }
}
