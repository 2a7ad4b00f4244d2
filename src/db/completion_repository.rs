use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::db::models::CompletionRow;
use crate::engine::CompletionRecord;

/// Repository for completion record database operations
pub struct CompletionRepository;

impl CompletionRepository {
    /// Append a completion record. Records are never updated or deleted.
    pub async fn insert(pool: &Pool<Postgres>, record: &CompletionRecord) -> Result<(), sqlx::Error> {
        debug!(
            "Inserting completion: id={}, job_id={}, amount_cents={}",
            record.id,
            record.job_id,
            record.amount.cents()
        );

        sqlx::query(
            r#"
            INSERT INTO completion_records
                (id, job_id, amount_cents, payout_destination, accrued_seconds, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(&record.job_id)
        .bind(record.amount.cents())
        .bind(&record.payout_destination)
        .bind(record.accrued_seconds.map(|s| s as i64))
        .bind(record.completed_at)
        .execute(pool)
        .await?;

        debug!("Completion {} stored", record.id);
        Ok(())
    }

    /// Most recent records first, optionally filtered by job
    pub async fn recent(
        pool: &Pool<Postgres>,
        job_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CompletionRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CompletionRow>(
            r#"
            SELECT id, job_id, amount_cents, payout_destination, accrued_seconds, completed_at
            FROM completion_records
            WHERE ($1::TEXT IS NULL OR job_id = $1)
            ORDER BY completed_at DESC
            LIMIT $2
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        debug!("Fetched {} completion records", rows.len());
        Ok(rows.into_iter().map(CompletionRecord::from).collect())
    }
}
