//! Student and document rows, assembled into engine snapshots.

use chrono::NaiveDate;
use extprop_core::dates::ISO_DATE_FORMAT;
use extprop_core::entity::{Document, ExtendedProperties, Student};
use extprop_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

fn iso(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(ISO_DATE_FORMAT).to_string())
}

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentRow {
    pub id: DbId,
    pub student_no: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StudentRow {
    pub fn into_student(self, documents: Vec<Document>, extended: ExtendedProperties) -> Student {
        Student {
            id: self.id,
            student_no: self.student_no,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            status: self.status,
            date_of_birth: iso(self.date_of_birth),
            nationality: self.nationality,
            documents,
            extended,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentRow {
    pub id: DbId,
    pub student_id: Option<DbId>,
    pub doc_type: String,
    pub doc_number: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    pub fields: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DocumentRow {
    /// Non-object `fields` payloads are dropped.
    pub fn into_document(self, extended: ExtendedProperties) -> Document {
        let fields = match self.fields {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Document {
            id: self.id,
            student_id: self.student_id,
            doc_type: self.doc_type,
            doc_number: self.doc_number,
            issued_on: iso(self.issued_on),
            expires_on: iso(self.expires_on),
            fields,
            extended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn document_row_formats_dates_and_keeps_fields() {
        let row = DocumentRow {
            id: 5,
            student_id: Some(1),
            doc_type: "IMM".into(),
            doc_number: None,
            issued_on: NaiveDate::from_ymd_opt(2024, 9, 1),
            expires_on: None,
            fields: json!({ "ExpiryDate": "2026/05/01" }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc = row.into_document(ExtendedProperties::new());
        assert_eq!(doc.issued_on.as_deref(), Some("2024-09-01"));
        assert_eq!(doc.fields["ExpiryDate"], json!("2026/05/01"));
    }

    #[test]
    fn scalar_fields_payload_is_dropped() {
        let row = DocumentRow {
            id: 5,
            student_id: None,
            doc_type: "IMM".into(),
            doc_number: None,
            issued_on: None,
            expires_on: None,
            fields: json!("not an object"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(row.into_document(ExtendedProperties::new()).fields.is_empty());
    }
}
