//! Repository for the `documents` table.

use sqlx::PgPool;

use crate::models::entity::DocumentRow;

const COLUMNS: &str = "\
    id, student_id, doc_type, doc_number, issued_on, expires_on, \
    fields, created_at, updated_at";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn list_all(pool: &PgPool) -> Result<Vec<DocumentRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents ORDER BY id");
        sqlx::query_as::<_, DocumentRow>(&query).fetch_all(pool).await
    }
}
