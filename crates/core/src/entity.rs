//! Entity projections: read-only snapshots of students and documents with
//! their extended properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path;
use crate::types::{DbId, EntityType};

/// Flat map of extended-property code to current value.
pub type ExtendedProperties = BTreeMap<String, Option<String>>;

/// What the engine needs from an entity.
pub trait EntityProjection: Send + Sync {
    fn entity_type(&self) -> EntityType;

    fn entity_id(&self) -> DbId;

    fn extended_properties(&self) -> &ExtendedProperties;

    /// Serialized form that paths are resolved against.
    fn to_json(&self) -> Option<Value>;

    /// Resolve a dotted, optionally bracket-filtered path. `None` when any
    /// step is missing or null.
    ///
    /// Serializes the entity on every call; wrap it in a [`JsonView`] when
    /// resolving many paths.
    fn resolve_path(&self, path: &str) -> Option<Value> {
        let root = self.to_json()?;
        path::resolve(&root, self.extended_properties(), path)
    }

    /// Current raw value of one extended property.
    fn extended_value(&self, property_code: &str) -> Option<&str> {
        self.extended_properties()
            .get(property_code)
            .and_then(|v| v.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub id: DbId,
    pub student_id: Option<DbId>,
    pub doc_type: String,
    pub doc_number: Option<String>,
    pub issued_on: Option<String>,
    pub expires_on: Option<String>,
    /// Free-form captured fields (e.g. `ExpiryDate`, `IssuingCountry`).
    pub fields: Map<String, Value>,
    pub extended: ExtendedProperties,
}

impl EntityProjection for Document {
    fn entity_type(&self) -> EntityType {
        EntityType::Document
    }

    fn entity_id(&self) -> DbId {
        self.id
    }

    fn extended_properties(&self) -> &ExtendedProperties {
        &self.extended
    }

    fn to_json(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }
}

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    pub id: DbId,
    pub student_no: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub documents: Vec<Document>,
    pub extended: ExtendedProperties,
}

impl EntityProjection for Student {
    fn entity_type(&self) -> EntityType {
        EntityType::Student
    }

    fn entity_id(&self) -> DbId {
        self.id
    }

    fn extended_properties(&self) -> &ExtendedProperties {
        &self.extended
    }

    fn to_json(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Any entity the engine can evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType")]
pub enum Entity {
    #[serde(alias = "student")]
    Student(Student),
    #[serde(alias = "document")]
    Document(Document),
}

impl Entity {
    fn projection(&self) -> &dyn EntityProjection {
        match self {
            Self::Student(s) => s,
            Self::Document(d) => d,
        }
    }

    /// Mutable access to the extended map, used when a store refreshes the
    /// snapshot with its current values.
    pub fn extended_mut(&mut self) -> &mut ExtendedProperties {
        match self {
            Self::Student(s) => &mut s.extended,
            Self::Document(d) => &mut d.extended,
        }
    }
}

impl From<Student> for Entity {
    fn from(s: Student) -> Self {
        Self::Student(s)
    }
}

impl From<Document> for Entity {
    fn from(d: Document) -> Self {
        Self::Document(d)
    }
}

impl EntityProjection for Entity {
    fn entity_type(&self) -> EntityType {
        self.projection().entity_type()
    }

    fn entity_id(&self) -> DbId {
        self.projection().entity_id()
    }

    fn extended_properties(&self) -> &ExtendedProperties {
        self.projection().extended_properties()
    }

    fn to_json(&self) -> Option<Value> {
        self.projection().to_json()
    }
}

// ---------------------------------------------------------------------------
// JsonView
// ---------------------------------------------------------------------------

/// An entity paired with its serialized form, built once so every path
/// lookup during one evaluation shares it.
pub struct JsonView<'a, E: ?Sized> {
    entity: &'a E,
    root: Option<Value>,
}

impl<'a, E: EntityProjection + ?Sized> JsonView<'a, E> {
    pub fn new(entity: &'a E) -> Self {
        Self {
            entity,
            root: entity.to_json(),
        }
    }
}

impl<E: EntityProjection + ?Sized> EntityProjection for JsonView<'_, E> {
    fn entity_type(&self) -> EntityType {
        self.entity.entity_type()
    }

    fn entity_id(&self) -> DbId {
        self.entity.entity_id()
    }

    fn extended_properties(&self) -> &ExtendedProperties {
        self.entity.extended_properties()
    }

    fn to_json(&self) -> Option<Value> {
        self.root.clone()
    }

    fn resolve_path(&self, path: &str) -> Option<Value> {
        path::resolve(self.root.as_ref()?, self.extended_properties(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student_with_documents() -> Student {
        let mut imm = Document {
            id: 2,
            student_id: Some(1),
            doc_type: "imm".into(),
            ..Document::default()
        };
        imm.fields.insert("ExpiryDate".into(), json!("2026-06-30"));
        let mut passport = Document {
            id: 3,
            student_id: Some(1),
            doc_type: "PASSPORT".into(),
            ..Document::default()
        };
        passport.fields.insert("ExpiryDate".into(), json!("2031-01-01"));
        Student {
            id: 1,
            first_name: "Ana".into(),
            documents: vec![passport, imm],
            ..Student::default()
        }
    }

    #[test]
    fn student_resolves_filtered_document_field() {
        let s = student_with_documents();
        assert_eq!(
            s.resolve_path("documents[docType=IMM].fields.ExpiryDate"),
            Some(json!("2026-06-30"))
        );
        assert_eq!(s.resolve_path("documents[docType=VISA].fields.ExpiryDate"), None);
    }

    #[test]
    fn entity_delegates_to_variant() {
        let mut s = student_with_documents();
        s.extended.insert("Visa".into(), Some("F1".into()));
        let e = Entity::from(s);
        assert_eq!(e.entity_type(), EntityType::Student);
        assert_eq!(e.entity_id(), 1);
        assert_eq!(e.extended_value("Visa"), Some("F1"));
        assert_eq!(e.resolve_path("ext.Visa"), Some(json!("F1")));
        assert_eq!(e.resolve_path("firstName"), Some(json!("Ana")));
    }

    #[test]
    fn document_exposes_its_own_fields() {
        let d = Document {
            id: 9,
            doc_type: "IMM".into(),
            expires_on: Some("2025-12-31".into()),
            ..Document::default()
        };
        assert_eq!(d.entity_type(), EntityType::Document);
        assert_eq!(d.resolve_path("expiresOn"), Some(json!("2025-12-31")));
    }

    #[test]
    fn json_view_resolves_like_the_entity() {
        let e = Entity::from(student_with_documents());
        let view = JsonView::new(&e);
        for path in ["firstName", "documents[docType=IMM].fields.ExpiryDate", "ext.Visa", "nope"] {
            assert_eq!(view.resolve_path(path), e.resolve_path(path), "{path}");
        }
        assert_eq!(view.entity_id(), 1);
    }

    #[test]
    fn entity_deserializes_from_tagged_json() {
        let e: Entity = serde_json::from_value(json!({
            "entityType": "Student",
            "id": 5,
            "firstName": "Li",
            "extended": {"Visa": null}
        }))
        .unwrap();
        assert_eq!(e.entity_id(), 5);
        assert_eq!(e.extended_value("Visa"), None);
    }
}
