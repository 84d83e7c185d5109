//! Repository for the `repair_runs` table.

use extprop_core::types::DbId;
use sqlx::PgPool;

pub struct RepairRunRepo;

impl RepairRunRepo {
    /// Open a run, returning its id.
    pub async fn start(pool: &PgPool, mode: &str, actor: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO repair_runs (mode, actor) VALUES ($1, $2) RETURNING id",
        )
        .bind(mode)
        .bind(actor)
        .fetch_one(pool)
        .await
    }

    /// Stamp the completion time and counts. Returns `false` for an unknown id.
    pub async fn complete(
        pool: &PgPool,
        run_id: DbId,
        violation_count: i64,
        repaired_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE repair_runs \
             SET completed_at = now(), violation_count = $2, repaired_count = $3 \
             WHERE id = $1",
        )
        .bind(run_id)
        .bind(violation_count)
        .bind(repaired_count)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
