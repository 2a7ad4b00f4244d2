//! Job session and earnings accrual engine.
//!
//! Sessions accrue time through a pure clock, earnings are projected from
//! the accrued basis, and completions pass through a per-job admission gate
//! before the finalizer writes exactly one audit record.

pub mod admission;
pub mod board;
pub mod clock;
pub mod earnings;
pub mod error;
pub mod finalizer;
pub mod ledger;
pub mod payout;
pub mod session;
pub mod settings;

pub use admission::Remaining;
pub use board::{JobBoard, JobDraft, JobSnapshot, JobStatus, JobView};
pub use clock::{Clock, SystemClock};
pub use earnings::{Money, PayType};
pub use error::EngineError;
pub use finalizer::{CompletionFinalizer, CompletionOutcome, CompletionRequest};
pub use ledger::{CompletionLedger, CompletionRecord};
pub use payout::{PayoutOption, PayoutOptions};
pub use settings::{JobSettings, SettingsUpdate};
