use thiserror::Error;

use super::JobSnapshot;

/// Why a completion could not name a payable basis or destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidPayoutReason {
    /// Time-based job with nothing accrued
    NoAccruedTime,
    /// Destination given but empty
    BlankDestination,
    /// Destination not among the payout options
    UnknownDestination(String),
}

impl std::fmt::Display for InvalidPayoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidPayoutReason::NoAccruedTime => {
                write!(f, "no time has been tracked for this job yet")
            }
            InvalidPayoutReason::BlankDestination => write!(f, "a payout destination is required"),
            InvalidPayoutReason::UnknownDestination(value) => {
                write!(f, "'{}' is not an available payout destination", value)
            }
        }
    }
}

/// Errors from the authoritative job path.
///
/// The recoverable transition errors carry the job's current snapshot so
/// callers can resynchronize their view.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {} already has a session running", .0.id)]
    AlreadyActive(Box<JobSnapshot>),

    #[error("job {} has no running session to pause", .0.id)]
    NotActive(Box<JobSnapshot>),

    #[error("this job has reached its {limit}-per-day limit")]
    CapacityExceeded { limit: u32, job: Box<JobSnapshot> },

    #[error("cannot pay out this completion: {0}")]
    InvalidPayout(InvalidPayoutReason),

    #[error("job {} has nothing left to complete; it was already completed", .0.id)]
    StaleState(Box<JobSnapshot>),

    #[error("job {} is paid per task and does not track work sessions", .0.id)]
    TaskJobHasNoSession(Box<JobSnapshot>),

    #[error("invalid job definition: {0}")]
    InvalidJob(String),

    #[error("completion ledger unavailable: {0}")]
    Ledger(#[from] sqlx::Error),
}

impl EngineError {
    /// Authoritative snapshot attached to a recoverable rejection
    pub fn snapshot(&self) -> Option<&JobSnapshot> {
        match self {
            EngineError::AlreadyActive(job)
            | EngineError::NotActive(job)
            | EngineError::StaleState(job)
            | EngineError::TaskJobHasNoSession(job)
            | EngineError::CapacityExceeded { job, .. } => Some(job),
            _ => None,
        }
    }
}
