//! Repository for the `students` table.

use sqlx::PgPool;

use crate::models::entity::StudentRow;

const COLUMNS: &str = "\
    id, student_no, first_name, last_name, email, status, \
    date_of_birth, nationality, created_at, updated_at";

pub struct StudentRepo;

impl StudentRepo {
    pub async fn list_all(pool: &PgPool) -> Result<Vec<StudentRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students ORDER BY id");
        sqlx::query_as::<_, StudentRow>(&query).fetch_all(pool).await
    }
}
