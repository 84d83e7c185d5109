//! Path resolution over an entity's nested data.
//!
//! A path is a `.`-separated list of member names. Any segment may carry a
//! bracket filter, `documents[docType=IMM]`, which selects the first element
//! of a list whose nested `docType` equals `IMM` ignoring case. A leading
//! `ext` segment addresses the extended-property map instead of the entity
//! body. Resolution never fails: a missing member, a null intermediate or a
//! filter without a match all resolve to `None`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Leading segment that aliases the extended-property map.
pub const EXTENDED_ALIAS: &str = "ext";

#[derive(Debug, PartialEq, Eq)]
struct Segment<'a> {
    name: &'a str,
    filter: Option<(&'a str, &'a str)>,
}

/// Split on `.` outside of brackets so filter values may contain dots.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments
}

fn parse_segment(raw: &str) -> Segment<'_> {
    let raw = raw.trim();
    if let (Some(open), true) = (raw.find('['), raw.ends_with(']')) {
        let inner = &raw[open + 1..raw.len() - 1];
        if let Some((key, value)) = inner.split_once('=') {
            return Segment {
                name: raw[..open].trim(),
                filter: Some((key.trim(), value.trim())),
            };
        }
    }
    Segment {
        name: raw,
        filter: None,
    }
}

/// Look up a member by exact name, falling back to a case-insensitive match.
fn lookup_member<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    let object = value.as_object()?;
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// First element of `list` whose `key` member equals `expected`, ignoring case.
fn select_first<'v>(list: &'v Value, key: &str, expected: &str) -> Option<&'v Value> {
    list.as_array()?.iter().find(|element| {
        lookup_member(element, key)
            .and_then(scalar_text)
            .is_some_and(|text| text.eq_ignore_ascii_case(expected))
    })
}

fn extended_as_value(extended: &BTreeMap<String, Option<String>>) -> Value {
    let map: Map<String, Value> = extended
        .iter()
        .map(|(k, v)| {
            let value = v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()));
            (k.clone(), value)
        })
        .collect();
    Value::Object(map)
}

/// Resolve `path` against `root`, with `ext` aliasing `extended`.
pub fn resolve(
    root: &Value,
    extended: &BTreeMap<String, Option<String>>,
    path: &str,
) -> Option<Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let segments: Vec<Segment<'_>> = split_segments(path).into_iter().map(parse_segment).collect();

    let ext_root;
    let (mut current, rest) = match segments.first() {
        Some(first) if first.filter.is_none() && first.name.eq_ignore_ascii_case(EXTENDED_ALIAS) => {
            ext_root = extended_as_value(extended);
            (&ext_root, &segments[1..])
        }
        _ => (root, &segments[..]),
    };

    for segment in rest {
        let member = lookup_member(current, segment.name)?;
        current = match segment.filter {
            Some((key, expected)) => select_first(member, key, expected)?,
            None => member,
        };
        if current.is_null() {
            return None;
        }
    }

    if current.is_null() {
        None
    } else {
        Some(current.clone())
    }
}

/// String form of a resolved value: text as-is, numbers and booleans in
/// their literal form, containers as compact JSON. `Null` has no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_ext() -> BTreeMap<String, Option<String>> {
        BTreeMap::new()
    }

    fn student() -> Value {
        json!({
            "id": 7,
            "firstName": "Ana",
            "documents": [
                {"docType": "PASSPORT", "fields": {"ExpiryDate": "2030-01-01"}},
                {"docType": "imm", "fields": {"ExpiryDate": "2026-06-30"}},
                {"docType": "IMM", "fields": {"ExpiryDate": "2027-01-01"}}
            ],
            "address": null
        })
    }

    // -----------------------------------------------------------------------
    // Plain members
    // -----------------------------------------------------------------------

    #[test]
    fn resolves_top_level_member() {
        assert_eq!(resolve(&student(), &no_ext(), "firstName"), Some(json!("Ana")));
    }

    #[test]
    fn member_lookup_falls_back_to_case_insensitive() {
        assert_eq!(resolve(&student(), &no_ext(), "FIRSTNAME"), Some(json!("Ana")));
    }

    #[test]
    fn unknown_member_is_none() {
        assert_eq!(resolve(&student(), &no_ext(), "lastName"), None);
        assert_eq!(resolve(&student(), &no_ext(), "firstName.length"), None);
    }

    #[test]
    fn null_intermediate_short_circuits() {
        assert_eq!(resolve(&student(), &no_ext(), "address.city"), None);
    }

    #[test]
    fn empty_path_is_none() {
        assert_eq!(resolve(&student(), &no_ext(), "  "), None);
    }

    // -----------------------------------------------------------------------
    // Bracket filters
    // -----------------------------------------------------------------------

    #[test]
    fn filter_selects_first_case_insensitive_match() {
        let value = resolve(
            &student(),
            &no_ext(),
            "documents[docType=IMM].fields.ExpiryDate",
        );
        assert_eq!(value, Some(json!("2026-06-30")));
    }

    #[test]
    fn filter_without_match_is_none() {
        let value = resolve(&student(), &no_ext(), "documents[docType=VISA].fields.ExpiryDate");
        assert_eq!(value, None);
    }

    #[test]
    fn filter_on_non_list_is_none() {
        assert_eq!(resolve(&student(), &no_ext(), "firstName[a=b]"), None);
    }

    #[test]
    fn filter_value_may_contain_dots() {
        let root = json!({"items": [{"code": "a.b", "v": 1}]});
        assert_eq!(resolve(&root, &no_ext(), "items[code=a.b].v"), Some(json!(1)));
    }

    // -----------------------------------------------------------------------
    // Extended alias
    // -----------------------------------------------------------------------

    #[test]
    fn ext_alias_reads_extended_map() {
        let mut ext = BTreeMap::new();
        ext.insert("Visa".to_string(), Some("TR".to_string()));
        ext.insert("Empty".to_string(), None);
        assert_eq!(resolve(&student(), &ext, "ext.Visa"), Some(json!("TR")));
        assert_eq!(resolve(&student(), &ext, "ext.Empty"), None);
        assert_eq!(resolve(&student(), &ext, "ext.Missing"), None);
    }

    #[test]
    fn scalar_text_forms() {
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&json!(12)).as_deref(), Some("12"));
        assert_eq!(scalar_text(&Value::Null), None);
    }
}
