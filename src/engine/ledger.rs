use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::earnings::Money;
use crate::db::completion_repository::CompletionRepository;

/// Audit entry written exactly once per successful completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub job_id: String,
    pub amount: Money,
    pub payout_destination: String,
    /// Session seconds paid for; absent for task-based work
    pub accrued_seconds: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

/// Append-only store of completion records
#[derive(Clone)]
pub enum CompletionLedger {
    Memory(Arc<Mutex<Vec<CompletionRecord>>>),
    Postgres(Pool<Postgres>),
}

impl CompletionLedger {
    pub fn in_memory() -> Self {
        CompletionLedger::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn postgres(pool: Pool<Postgres>) -> Self {
        CompletionLedger::Postgres(pool)
    }

    pub fn backend(&self) -> &'static str {
        match self {
            CompletionLedger::Memory(_) => "memory",
            CompletionLedger::Postgres(_) => "postgres",
        }
    }

    pub async fn append(&self, record: &CompletionRecord) -> Result<(), sqlx::Error> {
        match self {
            CompletionLedger::Memory(records) => {
                records.lock().await.push(record.clone());
                debug!("Appended completion {} to in-memory ledger", record.id);
                Ok(())
            }
            CompletionLedger::Postgres(pool) => CompletionRepository::insert(pool, record).await,
        }
    }

    /// Newest first, optionally for one job only
    pub async fn recent(
        &self,
        job_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CompletionRecord>, sqlx::Error> {
        match self {
            CompletionLedger::Memory(records) => {
                let records = records.lock().await;
                Ok(records
                    .iter()
                    .rev()
                    .filter(|record| job_id.map_or(true, |id| record.job_id == id))
                    .take(limit.max(0) as usize)
                    .cloned()
                    .collect())
            }
            CompletionLedger::Postgres(pool) => CompletionRepository::recent(pool, job_id, limit).await,
        }
    }
}
