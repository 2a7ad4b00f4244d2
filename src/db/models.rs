use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::engine::{CompletionRecord, Money};

/// Database representation of a completion record
#[derive(Debug, FromRow)]
pub struct CompletionRow {
    pub id: Uuid,
    pub job_id: String,
    pub amount_cents: i64,
    pub payout_destination: String,
    pub accrued_seconds: Option<i64>,
    pub completed_at: DateTime<Utc>,
}

impl From<CompletionRow> for CompletionRecord {
    fn from(row: CompletionRow) -> Self {
        CompletionRecord {
            id: row.id,
            job_id: row.job_id,
            amount: Money::from_cents(row.amount_cents),
            payout_destination: row.payout_destination,
            accrued_seconds: row.accrued_seconds.map(|s| s.max(0) as u64),
            completed_at: row.completed_at,
        }
    }
}
