//! Per-property requirement checks.

use std::cmp::Ordering;

use serde_json::Value;

use crate::compare::{compare_promoted, parse_number};
use crate::path::scalar_text;
use crate::rules::{Constraints, Requirement};

/// Reason tags that carry no constraint detail.
pub mod reasons {
    pub const REQUIRED: &str = "required";
    pub const EMPTY_OK: &str = "empty-ok";
    pub const OK: &str = "ok";
}

/// Result of checking one value against one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub reason: String,
}

impl CheckOutcome {
    fn pass(reason: &str) -> Self {
        Self {
            passed: true,
            reason: reason.to_string(),
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn literal(value: &Value) -> String {
    scalar_text(value).unwrap_or_default()
}

fn joined(values: &[Value]) -> String {
    values.iter().map(literal).collect::<Vec<_>>().join("|")
}

fn contains_ignore_case(values: &[Value], needle: &str) -> bool {
    values.iter().any(|v| literal(v).eq_ignore_ascii_case(needle))
}

/// Check an already-normalized `value` against `requirement`.
pub fn check(requirement: &Requirement, value: Option<&str>) -> CheckOutcome {
    let blank = is_blank(value);
    if blank && requirement.required {
        return CheckOutcome::fail(reasons::REQUIRED);
    }
    if blank {
        return CheckOutcome::pass(reasons::EMPTY_OK);
    }
    let Some(constraints) = &requirement.constraints else {
        return CheckOutcome::pass(reasons::OK);
    };
    match first_failed_constraint(constraints, value.unwrap_or_default()) {
        Some(reason) => CheckOutcome::fail(reason),
        None => CheckOutcome::pass(reasons::OK),
    }
}

fn first_failed_constraint(c: &Constraints, value: &str) -> Option<String> {
    if let Some(pattern) = &c.regex {
        if !pattern.is_match(value) {
            return Some(format!("regex:{pattern}"));
        }
    }
    if let Some(expected) = &c.eq {
        let expected = literal(expected);
        if value != expected {
            return Some(format!("eq:{expected}"));
        }
    }
    if let Some(forbidden) = &c.neq {
        let forbidden = literal(forbidden);
        if value == forbidden {
            return Some(format!("neq:{forbidden}"));
        }
    }
    if let Some(allowed) = &c.in_set {
        if !allowed.iter().any(|v| literal(v) == value) {
            return Some(format!("in:{}", joined(allowed)));
        }
    }
    if let Some(allowed) = &c.any_of {
        if !contains_ignore_case(allowed, value) {
            return Some(format!("anyOf:{}", joined(allowed)));
        }
    }
    if let Some(forbidden) = &c.none_of {
        if contains_ignore_case(forbidden, value) {
            return Some(format!("noneOf:{}", joined(forbidden)));
        }
    }
    if let Some(number) = parse_number(value) {
        if let Some(min) = c.min {
            if number < min {
                return Some(format!("min:{min}"));
            }
        }
        if let Some(max) = c.max {
            if number > max {
                return Some(format!("max:{max}"));
            }
        }
    }
    let length = value.chars().count();
    if let Some(min_length) = c.min_length {
        if length < min_length {
            return Some(format!("minLength:{min_length}"));
        }
    }
    if let Some(max_length) = c.max_length {
        if length > max_length {
            return Some(format!("maxLength:{max_length}"));
        }
    }
    if let Some(bound) = &c.gte {
        let bound = literal(bound);
        if compare_promoted(value, &bound) == Ordering::Less {
            return Some(format!("gte:{bound}"));
        }
    }
    if let Some(bound) = &c.lte {
        let bound = literal(bound);
        if compare_promoted(value, &bound) == Ordering::Greater {
            return Some(format!("lte:{bound}"));
        }
    }
    None
}
