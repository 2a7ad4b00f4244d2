use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::clock::{self, format_hms};
use crate::engine::session::Session;
use crate::engine::{earnings, Clock, JobSnapshot, JobStatus, Money};

/// What the live display shows for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub job_id: String,
    pub status: JobStatus,
    pub elapsed_seconds: u64,
    pub elapsed_display: String,
    pub projected_amount: Money,
    pub projected_display: String,
    pub rendered_at: DateTime<Utc>,
}

/// Project a snapshot to `now`. Pure.
pub fn render(snapshot: &JobSnapshot, now: DateTime<Utc>) -> DisplayFrame {
    let session = Session {
        started_at: snapshot.active_session_started_at,
        accumulated_seconds: snapshot.active_session_accumulated_seconds,
    };
    let elapsed_seconds = clock::elapsed(&session, now);
    let projected_amount = earnings::project(snapshot.pay_type, snapshot.rate, elapsed_seconds);

    DisplayFrame {
        job_id: snapshot.id.clone(),
        status: snapshot.status,
        elapsed_seconds,
        elapsed_display: format_hms(elapsed_seconds),
        projected_amount,
        projected_display: projected_amount.to_string(),
        rendered_at: now,
    }
}

struct Tracker {
    snapshots: watch::Sender<JobSnapshot>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    trackers: HashMap<String, Tracker>,
    /// Newest revision acknowledged per job. `u64::MAX` marks a forgotten job.
    revisions: HashMap<String, u64>,
}

/// Non-authoritative refresher for jobs with a live session.
///
/// Each tracked job gets its own periodic task reading the last
/// acknowledged snapshot. Tasks never touch job state; they only write
/// frames. Cancelling one job's token leaves the others running.
/// Snapshots older than one already acknowledged are dropped, so replies
/// that race each other cannot revive a cleared session.
pub struct DisplaySynchronizer {
    clock: Arc<dyn Clock>,
    cadence: Duration,
    frames: Arc<RwLock<HashMap<String, DisplayFrame>>>,
    registry: Mutex<Registry>,
    root: CancellationToken,
}

impl DisplaySynchronizer {
    pub fn new(clock: Arc<dyn Clock>, cadence: Duration) -> Self {
        Self {
            clock,
            cadence,
            frames: Arc::new(RwLock::new(HashMap::new())),
            registry: Mutex::new(Registry::default()),
            root: CancellationToken::new(),
        }
    }

    /// Take in the snapshot returned by an authoritative call.
    ///
    /// Starts refreshing a job whose session just went live, resyncs a
    /// tracked one, and stops a job whose session is gone.
    pub async fn acknowledge(&self, snapshot: &JobSnapshot) {
        if self.root.is_cancelled() {
            return;
        }

        let mut registry = self.registry.lock().await;
        let seen = registry.revisions.get(&snapshot.id).copied();
        if seen.is_some_and(|revision| revision > snapshot.revision) {
            debug!(
                "Dropping stale snapshot of job {} (revision {})",
                snapshot.id, snapshot.revision
            );
            return;
        }
        registry.revisions.insert(snapshot.id.clone(), snapshot.revision);
        let trackers = &mut registry.trackers;

        if !snapshot.status.has_session() {
            if let Some(tracker) = trackers.remove(&snapshot.id) {
                tracker.cancel.cancel();
                debug!("Display refresh stopped for job {}", snapshot.id);
            }
            self.frames.write().await.remove(&snapshot.id);
            return;
        }

        let frame = render(snapshot, self.clock.now());

        if let Some(tracker) = trackers.get(&snapshot.id) {
            if !tracker.handle.is_finished() {
                tracker.snapshots.send_replace(snapshot.clone());
                self.frames.write().await.insert(snapshot.id.clone(), frame);
                return;
            }
        }

        let (snapshots, receiver) = watch::channel(snapshot.clone());
        let cancel = self.root.child_token();
        let handle = tokio::spawn(refresh_loop(
            snapshot.id.clone(),
            receiver,
            self.clock.clone(),
            self.cadence,
            self.frames.clone(),
            cancel.clone(),
        ));

        self.frames.write().await.insert(snapshot.id.clone(), frame);
        trackers.insert(
            snapshot.id.clone(),
            Tracker {
                snapshots,
                cancel,
                handle,
            },
        );
        debug!("Display refresh started for job {}", snapshot.id);
    }

    /// Stop showing a job that left the visible set. Later snapshots of
    /// it are ignored.
    pub async fn forget(&self, job_id: &str) {
        let mut registry = self.registry.lock().await;
        registry.revisions.insert(job_id.to_string(), u64::MAX);
        if let Some(tracker) = registry.trackers.remove(job_id) {
            tracker.cancel.cancel();
        }
        self.frames.write().await.remove(job_id);
    }

    pub async fn frame(&self, job_id: &str) -> Option<DisplayFrame> {
        self.frames.read().await.get(job_id).cloned()
    }

    pub async fn frames(&self) -> Vec<DisplayFrame> {
        let mut frames: Vec<DisplayFrame> = self.frames.read().await.values().cloned().collect();
        frames.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        frames
    }

    pub async fn is_tracking(&self, job_id: &str) -> bool {
        self.registry
            .lock()
            .await
            .trackers
            .get(job_id)
            .is_some_and(|tracker| !tracker.handle.is_finished())
    }

    /// Cancel every refresh task and wait for them to exit
    pub async fn shutdown(&self) {
        self.root.cancel();
        let handles: Vec<JoinHandle<()>> = self
            .registry
            .lock()
            .await
            .trackers
            .drain()
            .map(|(_, tracker)| tracker.handle)
            .collect();

        let count = handles.len();
        join_all(handles).await;
        info!("Stopped {} display refresh tasks", count);
    }
}

async fn refresh_loop(
    job_id: String,
    mut snapshots: watch::Receiver<JobSnapshot>,
    clock: Arc<dyn Clock>,
    cadence: Duration,
    frames: Arc<RwLock<HashMap<String, DisplayFrame>>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // sender gone: keep the last good frame and stop
        if snapshots.has_changed().is_err() {
            debug!("Snapshot source for job {} closed", job_id);
            break;
        }

        let frame = render(&snapshots.borrow_and_update(), clock.now());

        let mut frames = frames.write().await;
        if cancel.is_cancelled() {
            break;
        }
        frames.insert(job_id.clone(), frame);
    }
}
