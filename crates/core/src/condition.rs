//! Applicability conditions: a recursive boolean tree over entity paths.
//!
//! The entity under evaluation is passed explicitly to every call; the
//! evaluator keeps no state between calls and is safe to share across
//! threads.

use std::cmp::Ordering;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::compare::compare_promoted;
use crate::entity::EntityProjection;
use crate::path::scalar_text;
use crate::pattern::Pattern;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A leaf comparing the value at `path` against one literal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comparison {
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

/// A leaf testing membership of the value at `path` in a literal set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Membership {
    pub path: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternMatch {
    pub path: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathRef {
    pub path: String,
}

/// One condition node. Exactly one operator per node; a node with no
/// operator at all is [`Condition::Always`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub enum Condition {
    Always,
    All(Vec<Condition>),
    Any(Vec<Condition>),
    NoneOf(Vec<Condition>),
    Eq(Comparison),
    Ne(Comparison),
    In(Membership),
    NotIn(Membership),
    Regex(PatternMatch),
    Gt(Comparison),
    Gte(Comparison),
    Lt(Comparison),
    Lte(Comparison),
    Exists(PathRef),
    NotExists(PathRef),
}

/// Wire shape: an object with one optional slot per operator.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCondition {
    all: Option<Vec<Condition>>,
    any: Option<Vec<Condition>>,
    none: Option<Vec<Condition>>,
    eq: Option<Comparison>,
    ne: Option<Comparison>,
    #[serde(rename = "in")]
    in_set: Option<Membership>,
    not_in: Option<Membership>,
    regex: Option<PatternMatch>,
    gt: Option<Comparison>,
    gte: Option<Comparison>,
    lt: Option<Comparison>,
    lte: Option<Comparison>,
    exists: Option<PathRef>,
    not_exists: Option<PathRef>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let mut found: Vec<(&'static str, Condition)> = Vec::new();
        if let Some(c) = raw.all {
            found.push(("all", Condition::All(c)));
        }
        if let Some(c) = raw.any {
            found.push(("any", Condition::Any(c)));
        }
        if let Some(c) = raw.none {
            found.push(("none", Condition::NoneOf(c)));
        }
        if let Some(c) = raw.eq {
            found.push(("eq", Condition::Eq(c)));
        }
        if let Some(c) = raw.ne {
            found.push(("ne", Condition::Ne(c)));
        }
        if let Some(c) = raw.in_set {
            found.push(("in", Condition::In(c)));
        }
        if let Some(c) = raw.not_in {
            found.push(("notIn", Condition::NotIn(c)));
        }
        if let Some(c) = raw.regex {
            found.push(("regex", Condition::Regex(c)));
        }
        if let Some(c) = raw.gt {
            found.push(("gt", Condition::Gt(c)));
        }
        if let Some(c) = raw.gte {
            found.push(("gte", Condition::Gte(c)));
        }
        if let Some(c) = raw.lt {
            found.push(("lt", Condition::Lt(c)));
        }
        if let Some(c) = raw.lte {
            found.push(("lte", Condition::Lte(c)));
        }
        if let Some(c) = raw.exists {
            found.push(("exists", Condition::Exists(c)));
        }
        if let Some(c) = raw.not_exists {
            found.push(("notExists", Condition::NotExists(c)));
        }

        match found.len() {
            0 => Ok(Condition::Always),
            1 => Ok(found.remove(0).1),
            _ => {
                let names: Vec<&str> = found.iter().map(|(name, _)| *name).collect();
                Err(format!(
                    "condition must set exactly one operator, found: {}",
                    names.join(", ")
                ))
            }
        }
    }
}

/// Deserialize an optional condition where `null` and `{}` both mean "none".
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn resolved_text<E: EntityProjection + ?Sized>(entity: &E, path: &str) -> String {
    entity
        .resolve_path(path)
        .as_ref()
        .and_then(scalar_text)
        .unwrap_or_default()
}

fn literal_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_default()
}

fn ordered<E: EntityProjection + ?Sized>(entity: &E, leaf: &Comparison) -> Ordering {
    compare_promoted(&resolved_text(entity, &leaf.path), &literal_text(&leaf.value))
}

fn is_member<E: EntityProjection + ?Sized>(entity: &E, leaf: &Membership) -> bool {
    let actual = resolved_text(entity, &leaf.path);
    leaf.values.iter().any(|v| literal_text(v) == actual)
}

/// Evaluate `condition` against `entity`. Never fails: missing paths read as
/// empty text and type mismatches degrade to string comparison.
pub fn evaluate<E: EntityProjection + ?Sized>(condition: &Condition, entity: &E) -> bool {
    match condition {
        Condition::Always => true,
        Condition::All(children) => children.iter().all(|c| evaluate(c, entity)),
        Condition::Any(children) => children.iter().any(|c| evaluate(c, entity)),
        Condition::NoneOf(children) => !children.iter().any(|c| evaluate(c, entity)),
        Condition::Eq(leaf) => resolved_text(entity, &leaf.path) == literal_text(&leaf.value),
        Condition::Ne(leaf) => resolved_text(entity, &leaf.path) != literal_text(&leaf.value),
        Condition::In(leaf) => is_member(entity, leaf),
        Condition::NotIn(leaf) => !is_member(entity, leaf),
        Condition::Regex(leaf) => leaf.pattern.is_match(&resolved_text(entity, &leaf.path)),
        Condition::Gt(leaf) => ordered(entity, leaf) == Ordering::Greater,
        Condition::Gte(leaf) => ordered(entity, leaf) != Ordering::Less,
        Condition::Lt(leaf) => ordered(entity, leaf) == Ordering::Less,
        Condition::Lte(leaf) => ordered(entity, leaf) != Ordering::Greater,
        Condition::Exists(leaf) => entity.resolve_path(&leaf.path).is_some(),
        Condition::NotExists(leaf) => entity.resolve_path(&leaf.path).is_none(),
    }
}

/// An absent condition always applies.
pub fn applies<E: EntityProjection + ?Sized>(condition: Option<&Condition>, entity: &E) -> bool {
    condition.map_or(true, |c| evaluate(c, entity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Document, Entity, Student};
    use serde_json::json;

    fn cond(value: serde_json::Value) -> Condition {
        serde_json::from_value(value).unwrap()
    }

    fn student() -> Entity {
        let mut s = Student {
            id: 1,
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            status: Some("ACTIVE".into()),
            ..Student::default()
        };
        s.extended.insert("Nationality".into(), Some("BR".into()));
        s.extended.insert("Credits".into(), Some("10".into()));
        s.documents.push(Document {
            id: 10,
            doc_type: "IMM".into(),
            expires_on: Some("2026-01-31".into()),
            ..Document::default()
        });
        Entity::Student(s)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn empty_object_is_always() {
        assert_eq!(cond(json!({})), Condition::Always);
    }

    #[test]
    fn two_operators_are_rejected() {
        let err = serde_json::from_value::<Condition>(json!({
            "eq": {"path": "a", "value": "1"},
            "ne": {"path": "a", "value": "2"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("exactly one operator"));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(serde_json::from_value::<Condition>(json!({"between": {"path": "a"}})).is_err());
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    #[test]
    fn empty_groups() {
        let e = student();
        assert!(evaluate(&cond(json!({"all": []})), &e));
        assert!(!evaluate(&cond(json!({"any": []})), &e));
        assert!(evaluate(&cond(json!({"none": []})), &e));
    }

    #[test]
    fn nested_groups() {
        let c = cond(json!({"all": [
            {"eq": {"path": "status", "value": "ACTIVE"}},
            {"any": [
                {"eq": {"path": "ext.Nationality", "value": "US"}},
                {"in": {"path": "ext.Nationality", "values": ["BR", "AR"]}}
            ]},
            {"none": [{"exists": {"path": "ext.Visa"}}]}
        ]}));
        assert!(evaluate(&c, &student()));
    }

    // -----------------------------------------------------------------------
    // Leaves
    // -----------------------------------------------------------------------

    #[test]
    fn eq_is_ordinal() {
        let e = student();
        assert!(!evaluate(&cond(json!({"eq": {"path": "status", "value": "active"}})), &e));
        assert!(evaluate(&cond(json!({"ne": {"path": "status", "value": "active"}})), &e));
    }

    #[test]
    fn membership_uses_string_form() {
        let e = student();
        assert!(evaluate(&cond(json!({"in": {"path": "ext.Credits", "values": [10, 20]}})), &e));
        assert!(evaluate(&cond(json!({"notIn": {"path": "ext.Nationality", "values": ["US"]}})), &e));
    }

    #[test]
    fn regex_on_missing_value_matches_empty_string() {
        let e = student();
        assert!(evaluate(&cond(json!({"regex": {"path": "ext.Visa", "pattern": "^$"}})), &e));
        assert!(evaluate(&cond(json!({"regex": {"path": "lastName", "pattern": "^Sil"}})), &e));
    }

    #[test]
    fn ordered_comparisons_promote_numbers_and_dates() {
        let e = student();
        assert!(evaluate(&cond(json!({"gt": {"path": "ext.Credits", "value": 9}})), &e));
        assert!(evaluate(&cond(json!({"gte": {"path": "ext.Credits", "value": "10"}})), &e));
        assert!(evaluate(&cond(json!({"lt": {
            "path": "documents[docType=imm].expiresOn",
            "value": "2026/02/01"
        }})), &e));
        assert!(evaluate(&cond(json!({"lte": {"path": "ext.Credits", "value": 10.0}})), &e));
    }

    #[test]
    fn ordered_comparison_falls_back_to_ordinal() {
        // "10" vs "9a" cannot be promoted, so "10" < "9a" by text.
        let e = student();
        assert!(evaluate(&cond(json!({"lt": {"path": "ext.Credits", "value": "9a"}})), &e));
    }

    #[test]
    fn exists_and_not_exists() {
        let e = student();
        assert!(evaluate(&cond(json!({"exists": {"path": "ext.Nationality"}})), &e));
        assert!(evaluate(&cond(json!({"notExists": {"path": "documents[docType=VISA]"}})), &e));
    }

    #[test]
    fn absent_condition_applies() {
        assert!(applies(None, &student()));
    }
}
