use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use super::dto::{BulkJobResponse, JobError, JobResponse, SettingsResponse};
use super::models::{CompleteRequest, JobRequest, SettingsRequest};
use crate::api::validation::ErrorResponse;
use crate::display::{DisplayFrame, DisplaySynchronizer};
use crate::engine::{
    Clock, CompletionOutcome, CompletionRecord, EngineError, JobBoard, JobSnapshot, JobView,
    PayoutOption,
};

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// Rejected by the job engine
    Engine(EngineError),

    /// Request failed validation
    ValidationError(String),

    /// No display frame for a job without a live session
    NoDisplay(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Engine(e) => write!(f, "{}", e),
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::NoDisplay(id) => write!(f, "Job {} has no live session to display", id),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        ServiceError::Engine(e)
    }
}

impl ServiceError {
    fn code(&self) -> &'static str {
        match self {
            ServiceError::Engine(e) => match e {
                EngineError::NotFound(_) => "not_found",
                EngineError::AlreadyActive(_) => "already_active",
                EngineError::NotActive(_) => "not_active",
                EngineError::CapacityExceeded { .. } => "capacity_exceeded",
                EngineError::InvalidPayout(_) => "invalid_payout",
                EngineError::StaleState(_) => "stale_state",
                EngineError::TaskJobHasNoSession(_) => "task_job_has_no_session",
                EngineError::InvalidJob(_) => "invalid_job",
                EngineError::Ledger(_) => "ledger_unavailable",
            },
            ServiceError::ValidationError(_) => "validation_failed",
            ServiceError::NoDisplay(_) => "no_display",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Engine(e) => match e {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::AlreadyActive(_)
                | EngineError::NotActive(_)
                | EngineError::CapacityExceeded { .. }
                | EngineError::StaleState(_)
                | EngineError::TaskJobHasNoSession(_) => StatusCode::CONFLICT,
                EngineError::InvalidPayout(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::InvalidJob(_) => StatusCode::BAD_REQUEST,
                EngineError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NoDisplay(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut fields = serde_json::json!({ "code": self.code() });

        let error = match self {
            ServiceError::Engine(EngineError::Ledger(e)) => {
                error!("Ledger error: {}", e);
                fields["message"] = "Completion could not be recorded; nothing was changed".into();
                "Failed to process request".to_string()
            }
            ServiceError::Engine(e) => {
                warn!("Request rejected: {}", e);
                fields["message"] = e.to_string().into();
                if let EngineError::CapacityExceeded { limit, .. } = e {
                    fields["limit"] = (*limit).into();
                }
                if let Some(job) = e.snapshot() {
                    fields["job"] = serde_json::to_value(job).unwrap_or_default();
                }
                match e {
                    EngineError::NotFound(_) => "Not found",
                    EngineError::CapacityExceeded { .. } => "Daily limit reached",
                    EngineError::InvalidPayout(_) => "Invalid payout",
                    EngineError::InvalidJob(_) => "Validation failed",
                    _ => "Job state changed",
                }
                .to_string()
            }
            ServiceError::ValidationError(msg) => {
                warn!("Validation error: {}", msg);
                fields["message"] = msg.clone().into();
                "Validation failed".to_string()
            }
            ServiceError::NoDisplay(_) => {
                fields["message"] = self.to_string().into();
                "Not found".to_string()
            }
        };

        HttpResponse::build(status).json(ErrorResponse { error, fields })
    }
}

/// Job service: the authoritative operations plus display resync
pub struct JobService {
    board: Arc<JobBoard>,
    display: Arc<DisplaySynchronizer>,
    clock: Arc<dyn Clock>,
}

impl JobService {
    /// Create a new JobService instance
    pub fn new(board: Arc<JobBoard>, display: Arc<DisplaySynchronizer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            board,
            display,
            clock,
        }
    }

    /// Push the outcome of an authoritative call to the display. Rejections
    /// that carry a snapshot resync it too.
    async fn acknowledge<T>(&self, result: &Result<T, EngineError>, snapshot: impl Fn(&T) -> &JobSnapshot) {
        match result {
            Ok(value) => self.display.acknowledge(snapshot(value)).await,
            Err(e) => {
                if let Some(job) = e.snapshot() {
                    self.display.acknowledge(job).await;
                }
            }
        }
    }

    pub async fn list_jobs(&self) -> Vec<JobView> {
        self.board.list().await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobView, ServiceError> {
        Ok(self.board.get(job_id).await?)
    }

    pub async fn start(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        info!("Service: Starting job id={}", job_id);
        let result = self.board.start(job_id, self.clock.now()).await;
        self.acknowledge(&result, |s| s).await;
        Ok(result?)
    }

    pub async fn pause(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        info!("Service: Pausing job id={}", job_id);
        let result = self.board.pause(job_id, self.clock.now()).await;
        self.acknowledge(&result, |s| s).await;
        Ok(result?)
    }

    pub async fn complete(
        &self,
        job_id: &str,
        request: CompleteRequest,
    ) -> Result<CompletionOutcome, ServiceError> {
        info!("Service: Completing job id={}", job_id);
        let result = self
            .board
            .complete(job_id, request.into(), self.clock.now())
            .await;
        self.acknowledge(&result, |outcome| &outcome.job).await;
        Ok(result?)
    }

    /// Create a single job
    pub async fn create_job(&self, job: JobRequest) -> Result<JobResponse, ServiceError> {
        info!("Service: Creating job with title={}", job.title);
        let view = self.board.create(job.into(), self.clock.now()).await?;

        Ok(JobResponse {
            message: "Job created successfully".to_string(),
            job: view,
        })
    }

    pub async fn update_job(&self, job_id: &str, job: JobRequest) -> Result<JobResponse, ServiceError> {
        info!("Service: Updating job id={}", job_id);
        let result = self.board.update(job_id, job.into()).await;
        self.acknowledge(&result, |view| &view.snapshot).await;

        Ok(JobResponse {
            message: "Job updated successfully".to_string(),
            job: result?,
        })
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<(), ServiceError> {
        info!("Service: Deleting job id={}", job_id);
        self.board.delete(job_id).await?;
        self.display.forget(job_id).await;
        Ok(())
    }

    /// Bulk create jobs from an uploaded file
    ///
    /// # Business Logic
    /// - Validates each job individually
    /// - Collects validation errors with job titles
    /// - Creates only valid jobs
    /// - Returns summary with created count and errors
    pub async fn bulk_create_jobs(&self, jobs: Vec<JobRequest>) -> Result<BulkJobResponse, ServiceError> {
        info!("Service: Processing bulk job import for {} jobs", jobs.len());

        let mut created = 0;
        let mut errors = Vec::new();

        for job in jobs {
            if let Err(validation_errors) = job.validate() {
                let messages: Vec<String> = validation_errors
                    .field_errors()
                    .values()
                    .flat_map(|errors| {
                        errors.iter().map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| "Validation error".to_string())
                        })
                    })
                    .collect();

                warn!("Service: Validation failed for job: {}", job.title);
                errors.push(JobError {
                    title: job.title,
                    errors: messages,
                });
                continue;
            }

            let title = job.title.clone();
            match self.board.create(job.into(), self.clock.now()).await {
                Ok(_) => created += 1,
                Err(EngineError::InvalidJob(msg)) => errors.push(JobError {
                    title,
                    errors: vec![msg],
                }),
                Err(e) => return Err(e.into()),
            }
        }

        let error_count = errors.len();
        if error_count == 0 {
            info!("Service: Bulk import completed: {} jobs created", created);
        } else {
            warn!("Service: Bulk import completed with {} rejected jobs", error_count);
        }

        Ok(BulkJobResponse {
            message: format!(
                "Bulk job import completed. {} created, {} failed",
                created, error_count
            ),
            created,
            errors,
        })
    }

    pub async fn settings(&self) -> SettingsResponse {
        self.board.settings().await.into()
    }

    pub async fn update_settings(&self, request: SettingsRequest) -> Result<SettingsResponse, ServiceError> {
        info!("Service: Updating job settings");
        let settings = self
            .board
            .update_settings(request.into(), self.clock.now())
            .await?;
        Ok(settings.into())
    }

    pub async fn completions(
        &self,
        job_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<CompletionRecord>, ServiceError> {
        let limit = limit.unwrap_or(50).clamp(1, 500);
        self.board
            .finalizer()
            .ledger()
            .recent(job_id, limit)
            .await
            .map_err(|e| ServiceError::Engine(EngineError::Ledger(e)))
    }

    pub fn payout_options(&self) -> Vec<PayoutOption> {
        self.board.finalizer().payouts().options().to_vec()
    }

    pub async fn display_frame(&self, job_id: &str) -> Result<DisplayFrame, ServiceError> {
        self.board.get(job_id).await?;
        self.display
            .frame(job_id)
            .await
            .ok_or_else(|| ServiceError::NoDisplay(job_id.to_string()))
    }

    pub async fn display_frames(&self) -> Vec<DisplayFrame> {
        self.display.frames().await
    }
}
