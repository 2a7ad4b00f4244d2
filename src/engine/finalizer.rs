use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::board::JobEntry;
use super::earnings::{self, PayType};
use super::error::{EngineError, InvalidPayoutReason};
use super::ledger::{CompletionLedger, CompletionRecord};
use super::payout::{PayoutOptions, PayoutRejection};
use super::JobSnapshot;

/// What a completion pays for, captured when the request arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualBasis {
    /// Session seconds of a time-based job
    Elapsed(u64),
    /// One unit of task-based work
    Task,
}

/// Caller's side of a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub payout_destination: Option<String>,
    /// Retry key for task-based completions
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub job: JobSnapshot,
    pub completion: CompletionRecord,
}

/// The only path that produces completion records
pub struct CompletionFinalizer {
    ledger: CompletionLedger,
    payouts: PayoutOptions,
}

impl CompletionFinalizer {
    pub fn new(ledger: CompletionLedger, payouts: PayoutOptions) -> Self {
        Self { ledger, payouts }
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    pub fn payouts(&self) -> &PayoutOptions {
        &self.payouts
    }

    /// Commit one completion against a locked job entry.
    ///
    /// All changes are staged on a copy of the entry and written back only
    /// after the record is in the ledger, so any rejection or storage
    /// failure leaves the entry exactly as it was.
    pub async fn finalize(
        &self,
        entry: &mut JobEntry,
        basis: AccrualBasis,
        request: CompletionRequest,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, EngineError> {
        let mut staged = entry.clone();
        let job_id = staged.definition.id.clone();

        let grant = staged.quota.admit().map_err(|rejected| {
            warn!(
                "Completion of job {} rejected: daily limit of {} reached",
                job_id, rejected.limit
            );
            EngineError::CapacityExceeded {
                limit: rejected.limit,
                job: Box::new(entry.snapshot()),
            }
        })?;

        let payout_destination = self
            .payouts
            .resolve(request.payout_destination.as_deref())
            .map_err(|rejection| {
                warn!("Completion of job {} rejected: bad payout destination", job_id);
                EngineError::InvalidPayout(match rejection {
                    PayoutRejection::Blank => InvalidPayoutReason::BlankDestination,
                    PayoutRejection::Unknown(value) => InvalidPayoutReason::UnknownDestination(value),
                })
            })?;

        let (elapsed, accrued_seconds) = match basis {
            AccrualBasis::Elapsed(seconds) => (seconds, Some(seconds)),
            AccrualBasis::Task => (0, None),
        };
        let amount = earnings::project(staged.definition.pay_type, staged.definition.rate, elapsed);

        staged.session = None;
        staged.touch();
        match staged.definition.pay_type {
            PayType::Time => staged.closed_by_completion = true,
            PayType::Task => staged.last_idempotency_key = request.idempotency_key,
        }

        let record = CompletionRecord {
            id: Uuid::new_v4(),
            job_id: job_id.clone(),
            amount,
            payout_destination,
            accrued_seconds,
            completed_at: now,
        };

        if let Err(e) = self.ledger.append(&record).await {
            error!("Failed to record completion of job {}: {}", job_id, e);
            return Err(EngineError::Ledger(e));
        }

        *entry = staged;
        info!(
            "Job {} completed: amount={}, destination={}, completed_today={}",
            job_id, record.amount, record.payout_destination, grant.completed_today
        );

        Ok(CompletionOutcome {
            job: entry.snapshot(),
            completion: record,
        })
    }
}
