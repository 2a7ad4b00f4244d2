use chrono::{DateTime, Utc};
use serde::Serialize;

use super::clock;

/// Work interval of a time-based job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Set while the session is running, cleared while paused
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds banked by earlier running intervals
    pub accumulated_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Paused,
}

impl SessionState {
    pub fn of(session: Option<&Session>) -> Self {
        match session {
            None => SessionState::Idle,
            Some(Session {
                started_at: Some(_),
                ..
            }) => SessionState::Active,
            Some(_) => SessionState::Paused,
        }
    }
}

/// Why a transition was refused. The job board turns these into errors
/// carrying the authoritative snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    AlreadyActive,
    NotActive,
    NoSession,
}

/// `Idle|Paused -> Active`
pub fn start(slot: &mut Option<Session>, now: DateTime<Utc>) -> Result<SessionState, Refusal> {
    match slot {
        None => {
            *slot = Some(Session {
                started_at: Some(now),
                accumulated_seconds: 0,
            });
            Ok(SessionState::Idle)
        }
        Some(session) if session.started_at.is_some() => Err(Refusal::AlreadyActive),
        Some(session) => {
            session.started_at = Some(now);
            Ok(SessionState::Paused)
        }
    }
}

/// `Active -> Paused`, folding the running interval into the base.
/// Returns the new accumulated total.
pub fn pause(slot: &mut Option<Session>, now: DateTime<Utc>) -> Result<u64, Refusal> {
    let session = slot.as_mut().ok_or(Refusal::NotActive)?;
    let started_at = session.started_at.take().ok_or(Refusal::NotActive)?;
    session.accumulated_seconds += clock::whole_seconds_between(started_at, now);
    Ok(session.accumulated_seconds)
}

/// Accrual basis of a live session, captured at `now`
pub fn capture(slot: &Option<Session>, now: DateTime<Utc>) -> Result<u64, Refusal> {
    slot.as_ref()
        .map(|session| clock::elapsed(session, now))
        .ok_or(Refusal::NoSession)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn start_from_idle_opens_fresh_session() {
        let mut slot = None;
        assert_eq!(start(&mut slot, t0()), Ok(SessionState::Idle));
        assert_eq!(
            slot,
            Some(Session {
                started_at: Some(t0()),
                accumulated_seconds: 0
            })
        );
        assert_eq!(SessionState::of(slot.as_ref()), SessionState::Active);
    }

    #[test]
    fn start_while_running_is_refused() {
        let mut slot = None;
        start(&mut slot, t0()).unwrap();
        assert_eq!(
            start(&mut slot, t0() + Duration::seconds(5)),
            Err(Refusal::AlreadyActive)
        );
        assert_eq!(slot.as_ref().unwrap().started_at, Some(t0()));
    }

    #[test]
    fn pause_resume_keeps_time_continuous() {
        let mut slot = None;
        start(&mut slot, t0()).unwrap();
        assert_eq!(pause(&mut slot, t0() + Duration::seconds(300)), Ok(300));
        assert_eq!(SessionState::of(slot.as_ref()), SessionState::Paused);

        // time spent paused does not count
        let resumed_at = t0() + Duration::seconds(900);
        assert_eq!(start(&mut slot, resumed_at), Ok(SessionState::Paused));
        assert_eq!(capture(&slot, resumed_at), Ok(300));
        assert_eq!(capture(&slot, resumed_at + Duration::seconds(60)), Ok(360));

        assert_eq!(pause(&mut slot, resumed_at + Duration::seconds(60)), Ok(360));
    }

    #[test]
    fn pause_requires_running_session() {
        let mut slot = None;
        assert_eq!(pause(&mut slot, t0()), Err(Refusal::NotActive));

        start(&mut slot, t0()).unwrap();
        pause(&mut slot, t0() + Duration::seconds(10)).unwrap();
        assert_eq!(
            pause(&mut slot, t0() + Duration::seconds(20)),
            Err(Refusal::NotActive)
        );
        assert_eq!(slot.unwrap().accumulated_seconds, 10);
    }

    #[test]
    fn capture_without_session_is_refused() {
        assert_eq!(capture(&None, t0()), Err(Refusal::NoSession));
    }
}
