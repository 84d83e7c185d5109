//! Derivation of repair proposals from a requirement's ordered sources.

use crate::entity::EntityProjection;
use crate::normalize::{coerce, normalize};
use crate::requirement::{check, is_blank};
use crate::rules::{CandidateKind, Requirement};

/// First candidate value that, after coercion and normalization, passes
/// the requirement. `None` when there is no source or no candidate passes.
pub fn derive_value<E: EntityProjection + ?Sized>(
    requirement: &Requirement,
    entity: &E,
) -> Option<String> {
    let source = requirement.source.as_ref()?;

    for (index, candidate) in source.candidates.iter().enumerate() {
        let raw = match candidate.kind {
            CandidateKind::Literal => candidate.value.clone(),
            CandidateKind::Path => candidate
                .path
                .as_deref()
                .and_then(|path| entity.resolve_path(path)),
            CandidateKind::Reserved => {
                tracing::debug!(
                    property = %requirement.property,
                    index,
                    "Skipping unsupported derivation candidate"
                );
                continue;
            }
        };
        let Some(raw) = raw else { continue };

        let coerced = coerce(&raw, requirement.data_type);
        let normalized = normalize(
            coerced.as_deref(),
            requirement.normalize.as_ref(),
            requirement.data_type,
        );
        // A blank candidate would only "pass" as empty-ok.
        if is_blank(normalized.as_deref()) {
            continue;
        }
        if check(requirement, normalized.as_deref()).passed {
            return normalized;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Document, Student};
    use serde_json::json;

    fn requirement(value: serde_json::Value) -> Requirement {
        serde_json::from_value(value).unwrap()
    }

    fn student() -> Student {
        let mut imm = Document {
            id: 2,
            doc_type: "IMM".into(),
            ..Document::default()
        };
        imm.fields.insert("ExpiryDate".into(), json!("2026/06/30 00:00:00"));
        Student {
            id: 1,
            documents: vec![imm],
            ..Student::default()
        }
    }

    #[test]
    fn first_passing_candidate_wins() {
        let req = requirement(json!({
            "property": "VisaExpiry",
            "type": "date",
            "required": true,
            "constraints": {"regex": "^\\d{4}-\\d{2}-\\d{2}$"},
            "source": {"candidates": [
                {"kind": "path", "path": "documents[docType=VISA].fields.ExpiryDate"},
                {"kind": "literal", "value": "soon"},
                {"kind": "path", "path": "documents[docType=IMM].fields.ExpiryDate"},
                {"kind": "literal", "value": "2099-01-01"}
            ]}
        }));
        assert_eq!(derive_value(&req, &student()).as_deref(), Some("2026-06-30"));
    }

    #[test]
    fn reserved_kinds_are_skipped() {
        let req = requirement(json!({
            "property": "Code",
            "required": true,
            "source": {"candidates": [
                {"kind": "lookup", "value": "IGNORED"},
                {"kind": "literal", "value": "OK"}
            ]}
        }));
        assert_eq!(derive_value(&req, &student()).as_deref(), Some("OK"));
    }

    #[test]
    fn candidates_are_normalized_before_checking() {
        let req = requirement(json!({
            "property": "Code",
            "required": true,
            "constraints": {"regex": "^\\d{5}$"},
            "normalize": {"trim": true, "padLeft": 5},
            "source": {"candidates": [{"kind": "literal", "value": " 42 "}]}
        }));
        assert_eq!(derive_value(&req, &student()).as_deref(), Some("00042"));
    }

    #[test]
    fn none_when_nothing_passes() {
        let req = requirement(json!({
            "property": "Code",
            "required": true,
            "constraints": {"in": ["A"]},
            "source": {"candidates": [{"kind": "literal", "value": "B"}]}
        }));
        assert_eq!(derive_value(&req, &student()), None);
    }

    #[test]
    fn none_without_source() {
        let req = requirement(json!({"property": "Code"}));
        assert_eq!(derive_value(&req, &student()), None);
    }
}
