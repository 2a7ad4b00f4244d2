use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::admission::{Quota, Remaining};
use super::earnings::{Money, PayType};
use super::error::{EngineError, InvalidPayoutReason};
use super::finalizer::{AccrualBasis, CompletionFinalizer, CompletionOutcome, CompletionRequest};
use super::session::{self, Refusal, Session, SessionState};
use super::settings::{JobSettings, SettingsUpdate};

/// Displayed status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Available,
    Active,
    Paused,
    AtCapacity,
}

impl JobStatus {
    /// Active or paused: a session is live
    pub fn has_session(self) -> bool {
        matches!(self, JobStatus::Active | JobStatus::Paused)
    }
}

/// Authoritative view of one job, returned by every mutating call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub pay_type: PayType,
    pub rate: Money,
    pub daily_limit: Option<u32>,
    pub completed_today: u32,
    pub remaining: Remaining,
    pub active_session_started_at: Option<DateTime<Utc>>,
    pub active_session_accumulated_seconds: u64,
    /// Bumped on every change to the job; later snapshots carry larger values
    pub revision: u64,
}

/// Snapshot plus catalog metadata, for listings
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub snapshot: JobSnapshot,
    pub title: String,
    pub description: String,
    pub minimum_applied: bool,
}

/// Fields a management caller supplies for a job
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub pay_type: PayType,
    pub rate: Money,
    /// `None` and `Some(0)` are both unlimited
    pub daily_limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub pay_type: PayType,
    pub rate: Money,
    pub minimum_applied: bool,
}

/// Everything the board knows about one job. Guarded by its own mutex.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub definition: JobDefinition,
    pub quota: Quota,
    pub session: Option<Session>,
    /// The last session ended in a completion and nothing started since
    pub closed_by_completion: bool,
    /// Retry key of the last task completion
    pub last_idempotency_key: Option<String>,
    pub revision: u64,
}

impl JobEntry {
    /// A running clock always shows as active. A paused session on an
    /// exhausted job can neither resume nor complete, so it shows as at
    /// capacity until the next reset.
    pub fn status(&self) -> JobStatus {
        match SessionState::of(self.session.as_ref()) {
            SessionState::Active => JobStatus::Active,
            SessionState::Paused if self.quota.is_exhausted() => JobStatus::AtCapacity,
            SessionState::Paused => JobStatus::Paused,
            SessionState::Idle if self.quota.is_exhausted() => JobStatus::AtCapacity,
            SessionState::Idle => JobStatus::Available,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.definition.id.clone(),
            status: self.status(),
            pay_type: self.definition.pay_type,
            rate: self.definition.rate,
            daily_limit: self.quota.daily_limit(),
            completed_today: self.quota.completed_today(),
            remaining: self.quota.remaining(),
            active_session_started_at: self.session.as_ref().and_then(|s| s.started_at),
            active_session_accumulated_seconds: self
                .session
                .as_ref()
                .map_or(0, |s| s.accumulated_seconds),
            revision: self.revision,
        }
    }

    /// Record a change. Call with the entry locked.
    pub fn touch(&mut self) {
        self.revision += 1;
    }

    fn view(&self) -> JobView {
        JobView {
            snapshot: self.snapshot(),
            title: self.definition.title.clone(),
            description: self.definition.description.clone(),
            minimum_applied: self.definition.minimum_applied,
        }
    }

    fn capacity_exceeded(&self) -> Option<EngineError> {
        match (self.quota.daily_limit(), self.quota.is_exhausted()) {
            (Some(limit), true) => Some(EngineError::CapacityExceeded {
                limit,
                job: Box::new(self.snapshot()),
            }),
            _ => None,
        }
    }
}

type JobSlot = Arc<Mutex<JobEntry>>;

/// Process-wide registry of jobs and their live sessions.
///
/// Each job sits behind its own async mutex: `start`, `pause`, `complete`
/// and management writes on one job are totally ordered, while different
/// jobs never wait on each other. Lock order is settings, then the job
/// map, then a job entry.
pub struct JobBoard {
    jobs: RwLock<HashMap<String, JobSlot>>,
    sequence: AtomicU64,
    settings: RwLock<JobSettings>,
    finalizer: CompletionFinalizer,
}

impl JobBoard {
    pub fn new(finalizer: CompletionFinalizer, settings: JobSettings) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            settings: RwLock::new(settings),
            finalizer,
        }
    }

    pub fn finalizer(&self) -> &CompletionFinalizer {
        &self.finalizer
    }

    async fn slot(&self, job_id: &str) -> Result<JobSlot, EngineError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))
    }

    /// Start a time-based session, or resume a paused one
    pub async fn start(&self, job_id: &str, now: DateTime<Utc>) -> Result<JobSnapshot, EngineError> {
        let slot = self.slot(job_id).await?;
        let mut entry = slot.lock().await;

        if entry.definition.pay_type == PayType::Task {
            warn!("Start rejected for job {}: task-based work has no session", job_id);
            return Err(entry
                .capacity_exceeded()
                .unwrap_or_else(|| EngineError::TaskJobHasNoSession(Box::new(entry.snapshot()))));
        }

        if SessionState::of(entry.session.as_ref()) == SessionState::Active {
            warn!("Start rejected for job {}: session already running", job_id);
            return Err(EngineError::AlreadyActive(Box::new(entry.snapshot())));
        }

        if let Some(rejection) = entry.capacity_exceeded() {
            warn!("Start rejected for job {}: daily limit reached", job_id);
            return Err(rejection);
        }

        match session::start(&mut entry.session, now) {
            Ok(SessionState::Paused) => info!("Job {} resumed at {}", job_id, now),
            Ok(_) => info!("Job {} started at {}", job_id, now),
            Err(_) => return Err(EngineError::AlreadyActive(Box::new(entry.snapshot()))),
        }
        entry.closed_by_completion = false;
        entry.touch();

        Ok(entry.snapshot())
    }

    /// Pause a running session, banking its elapsed time
    pub async fn pause(&self, job_id: &str, now: DateTime<Utc>) -> Result<JobSnapshot, EngineError> {
        let slot = self.slot(job_id).await?;
        let mut entry = slot.lock().await;

        match session::pause(&mut entry.session, now) {
            Ok(accumulated) => {
                entry.touch();
                info!("Job {} paused with {}s accrued", job_id, accumulated);
                Ok(entry.snapshot())
            }
            Err(_) => {
                warn!("Pause rejected for job {}: no running session", job_id);
                Err(EngineError::NotActive(Box::new(entry.snapshot())))
            }
        }
    }

    /// Complete the job once, paying into the requested destination.
    ///
    /// The accrual basis is captured here, under the job's lock, before
    /// anything else runs.
    pub async fn complete(
        &self,
        job_id: &str,
        request: CompletionRequest,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, EngineError> {
        let slot = self.slot(job_id).await?;
        let mut entry = slot.lock().await;

        let basis = match entry.definition.pay_type {
            PayType::Time => match session::capture(&entry.session, now) {
                Ok(0) => {
                    warn!("Completion rejected for job {}: nothing accrued", job_id);
                    return Err(EngineError::InvalidPayout(InvalidPayoutReason::NoAccruedTime));
                }
                Ok(seconds) => AccrualBasis::Elapsed(seconds),
                Err(Refusal::NoSession) if entry.closed_by_completion => {
                    warn!("Completion rejected for job {}: session already completed", job_id);
                    return Err(EngineError::StaleState(Box::new(entry.snapshot())));
                }
                Err(_) => {
                    warn!("Completion rejected for job {}: no session", job_id);
                    return Err(EngineError::InvalidPayout(InvalidPayoutReason::NoAccruedTime));
                }
            },
            PayType::Task => {
                if request.idempotency_key.is_some()
                    && request.idempotency_key == entry.last_idempotency_key
                {
                    warn!("Completion rejected for job {}: duplicate request", job_id);
                    return Err(EngineError::StaleState(Box::new(entry.snapshot())));
                }
                AccrualBasis::Task
            }
        };

        self.finalizer.finalize(&mut entry, basis, request, now).await
    }

    pub async fn get(&self, job_id: &str) -> Result<JobView, EngineError> {
        let slot = self.slot(job_id).await?;
        let entry = slot.lock().await;
        Ok(entry.view())
    }

    /// All jobs ordered by title
    pub async fn list(&self) -> Vec<JobView> {
        let slots: Vec<JobSlot> = self.jobs.read().await.values().cloned().collect();

        let mut views = Vec::with_capacity(slots.len());
        for slot in slots {
            views.push(slot.lock().await.view());
        }
        views.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.snapshot.id.cmp(&b.snapshot.id))
        });
        views
    }

    pub async fn create(&self, draft: JobDraft, now: DateTime<Utc>) -> Result<JobView, EngineError> {
        let settings = self.settings.read().await;
        let draft = normalize_draft(draft)?;

        let id = self.sequence.fetch_add(1, Ordering::SeqCst).to_string();
        let (rate, minimum_applied) = apply_minimum_wage(draft.pay_type, draft.rate, &settings);
        let mut quota = Quota::new(draft.daily_limit, now);
        quota.reanchor(now, settings.daily_reset_hour);

        let entry = JobEntry {
            definition: JobDefinition {
                id: id.clone(),
                title: draft.title,
                description: draft.description,
                pay_type: draft.pay_type,
                rate,
                minimum_applied,
            },
            quota,
            session: None,
            closed_by_completion: false,
            last_idempotency_key: None,
            revision: 0,
        };
        let view = entry.view();

        self.jobs
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(entry)));

        info!("Job {} created: '{}'", id, view.title);
        Ok(view)
    }

    /// Replace a job's definition. Switching pay type is refused while a
    /// session is live.
    pub async fn update(&self, job_id: &str, draft: JobDraft) -> Result<JobView, EngineError> {
        let settings = self.settings.read().await;
        let draft = normalize_draft(draft)?;
        let slot = self.slot(job_id).await?;
        let mut entry = slot.lock().await;

        if entry.session.is_some() && entry.definition.pay_type != draft.pay_type {
            warn!("Update rejected for job {}: pay type change during session", job_id);
            return Err(EngineError::AlreadyActive(Box::new(entry.snapshot())));
        }

        let (rate, minimum_applied) = apply_minimum_wage(draft.pay_type, draft.rate, &settings);
        entry.definition.title = draft.title;
        entry.definition.description = draft.description;
        entry.definition.pay_type = draft.pay_type;
        entry.definition.rate = rate;
        entry.definition.minimum_applied = minimum_applied;
        entry.quota.set_limit(draft.daily_limit);
        entry.touch();

        info!("Job {} updated", job_id);
        Ok(entry.view())
    }

    /// Remove a job from the board
    pub async fn delete(&self, job_id: &str) -> Result<(), EngineError> {
        let removed = self.jobs.write().await.remove(job_id);
        match removed {
            Some(_) => {
                info!("Job {} deleted", job_id);
                Ok(())
            }
            None => Err(EngineError::NotFound(job_id.to_string())),
        }
    }

    pub async fn settings(&self) -> JobSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(
        &self,
        update: SettingsUpdate,
        now: DateTime<Utc>,
    ) -> Result<JobSettings, EngineError> {
        update.validate()?;

        let mut settings = self.settings.write().await;
        if let Some(wage) = update.minimum_hourly_wage {
            settings.minimum_hourly_wage = wage;
        }
        if let Some(limit) = update.default_daily_limit {
            settings.default_daily_limit = limit;
        }
        if let Some(hour) = update.daily_reset_hour {
            settings.daily_reset_hour = hour;
        }

        let slots: Vec<JobSlot> = self.jobs.read().await.values().cloned().collect();
        for slot in slots {
            let mut entry = slot.lock().await;
            if update.minimum_hourly_wage.is_some() && entry.definition.pay_type == PayType::Time {
                let (rate, minimum_applied) =
                    apply_minimum_wage(PayType::Time, entry.definition.rate, &settings);
                entry.definition.rate = rate;
                entry.definition.minimum_applied = minimum_applied;
            }
            if update.daily_reset_hour.is_some() {
                entry.quota.reanchor(now, settings.daily_reset_hour);
            }
            entry.touch();
        }

        info!("Job settings updated: {:?}", *settings);
        Ok(settings.clone())
    }

    /// Reset daily counters of every job whose reset boundary has passed.
    /// Returns the ids of the jobs that were reset.
    pub async fn roll_over(&self, now: DateTime<Utc>) -> Vec<String> {
        let reset_hour = self.settings.read().await.daily_reset_hour;
        let slots: Vec<JobSlot> = self.jobs.read().await.values().cloned().collect();

        let mut reset = Vec::new();
        for slot in slots {
            let mut entry = slot.lock().await;
            if entry.quota.roll_over(now, reset_hour) {
                entry.touch();
                debug!("Daily counter reset for job {}", entry.definition.id);
                reset.push(entry.definition.id.clone());
            }
        }
        reset
    }

    /// Starter jobs for an empty board
    pub async fn seed_defaults(&self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.jobs.read().await.is_empty() {
            return Ok(());
        }

        let seeds = [
            (
                "Freelance UI Sprint",
                "Deliver pixel-polished interface updates for client dashboards. Track milestones and report progress at the end of each shift.",
                PayType::Time,
                2450,
                2,
                0,
            ),
            (
                "Courier Delivery Route",
                "Cover the afternoon delivery route across downtown. Includes pickups and drop-offs with mileage reimbursement.",
                PayType::Time,
                1800,
                1,
                0,
            ),
            (
                "Product Survey Reviews",
                "Audit consumer survey responses for clarity and categorize feedback into actionable insights.",
                PayType::Task,
                3200,
                5,
                1,
            ),
            (
                "Bug Fix Bounty",
                "Resolve prioritized issues reported by QA. Each task includes reproduction steps and an acceptance checklist.",
                PayType::Task,
                7500,
                2,
                2,
            ),
        ];

        for (title, description, pay_type, cents, limit, completed) in seeds {
            let view = self
                .create(
                    JobDraft {
                        title: title.to_string(),
                        description: description.to_string(),
                        pay_type,
                        rate: Money::from_cents(cents),
                        daily_limit: Some(limit),
                    },
                    now,
                )
                .await?;

            if completed > 0 {
                let slot = self.slot(&view.snapshot.id).await?;
                let mut entry = slot.lock().await;
                entry.quota = entry.quota.clone().with_completed(completed);
            }
        }

        info!("Seeded {} starter jobs", seeds.len());
        Ok(())
    }
}

fn normalize_draft(mut draft: JobDraft) -> Result<JobDraft, EngineError> {
    draft.title = draft.title.trim().to_string();
    draft.description = draft.description.trim().to_string();

    if draft.title.is_empty() {
        return Err(EngineError::InvalidJob("Title is required.".to_string()));
    }
    if !draft.rate.is_positive() {
        return Err(EngineError::InvalidJob(
            "Pay rate must be greater than zero.".to_string(),
        ));
    }
    Ok(draft)
}

/// Time-based rates never go below the minimum wage
fn apply_minimum_wage(pay_type: PayType, rate: Money, settings: &JobSettings) -> (Money, bool) {
    match pay_type {
        PayType::Task => (rate, false),
        PayType::Time if rate < settings.minimum_hourly_wage => (settings.minimum_hourly_wage, true),
        PayType::Time => (rate, rate == settings.minimum_hourly_wage),
    }
}
