use actix_multipart::form::{bytes::Bytes, MultipartForm};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::{CompletionRequest, JobDraft, Money, PayType, SettingsUpdate};

/// Job definition as submitted by a management caller
#[derive(Deserialize, Serialize, Debug, Clone, Validate)]
pub struct JobRequest {
    #[validate(length(
        min = 1,
        max = 120,
        message = "Title must be between 1 and 120 characters"
    ))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub pay_type: PayType,

    #[validate(range(min = 0.01, message = "Pay rate must be greater than zero"))]
    pub rate: f64,

    /// Omitted, null or 0 means unlimited
    #[serde(default)]
    #[validate(range(max = 1000, message = "Daily limit must be at most 1000"))]
    pub daily_limit: Option<u32>,
}

impl From<JobRequest> for JobDraft {
    fn from(request: JobRequest) -> Self {
        JobDraft {
            title: request.title,
            description: request.description,
            pay_type: request.pay_type,
            rate: Money::from_decimal(request.rate),
            daily_limit: request.daily_limit,
        }
    }
}

/// Optional body of a completion call
#[derive(Deserialize, Debug, Default)]
pub struct CompleteRequest {
    pub payout_destination: Option<String>,
    pub idempotency_key: Option<String>,
}

impl From<CompleteRequest> for CompletionRequest {
    fn from(request: CompleteRequest) -> Self {
        CompletionRequest {
            payout_destination: request.payout_destination,
            idempotency_key: request
                .idempotency_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }
}

#[derive(Deserialize, Debug, Validate)]
pub struct SettingsRequest {
    #[validate(range(min = 0.01, message = "Minimum wage must be greater than zero"))]
    pub minimum_hourly_wage: Option<f64>,

    pub default_daily_limit: Option<u32>,

    #[validate(range(max = 23, message = "Reset hour must be between 0 and 23"))]
    pub daily_reset_hour: Option<u32>,
}

impl From<SettingsRequest> for SettingsUpdate {
    fn from(request: SettingsRequest) -> Self {
        SettingsUpdate {
            minimum_hourly_wage: request.minimum_hourly_wage.map(Money::from_decimal),
            default_daily_limit: request.default_daily_limit,
            daily_reset_hour: request.daily_reset_hour,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CompletionQuery {
    pub job_id: Option<String>,
    pub limit: Option<i64>,
}

/// Multipart upload carrying a JSON array of job requests
#[derive(MultipartForm)]
pub struct JobImportForm {
    #[multipart(limit = "5MB")]
    pub file: Bytes,
}
