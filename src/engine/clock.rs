use chrono::{DateTime, Utc};

use super::session::Session;

/// Source of the current instant for the service layer.
///
/// Engine operations never read the wall clock themselves; they take `now`
/// as an argument so tests can drive time explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Live elapsed seconds of a session at `now`.
///
/// `accumulated_seconds + floor(now - started_at)` while the session is
/// running, the accumulated base otherwise. A negative delta (start instant
/// in the future, skewed clocks) counts as zero.
pub fn elapsed(session: &Session, now: DateTime<Utc>) -> u64 {
    match session.started_at {
        Some(started_at) => session.accumulated_seconds + whole_seconds_between(started_at, now),
        None => session.accumulated_seconds,
    }
}

/// Whole seconds from `from` to `to`, clamped at zero
pub fn whole_seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().max(0) as u64
}

/// Render a duration as `HH:MM:SS`. Hours keep widening past 99.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn running_session_adds_live_delta_to_base() {
        let session = Session {
            started_at: Some(t0()),
            accumulated_seconds: 120,
        };
        assert_eq!(elapsed(&session, t0() + Duration::seconds(45)), 165);
    }

    #[test]
    fn sub_second_remainder_is_floored() {
        let session = Session {
            started_at: Some(t0()),
            accumulated_seconds: 0,
        };
        assert_eq!(elapsed(&session, t0() + Duration::milliseconds(1999)), 1);
    }

    #[test]
    fn future_start_clamps_to_base() {
        let session = Session {
            started_at: Some(t0() + Duration::seconds(30)),
            accumulated_seconds: 10,
        };
        assert_eq!(elapsed(&session, t0()), 10);
    }

    #[test]
    fn paused_session_ignores_now() {
        let session = Session {
            started_at: None,
            accumulated_seconds: 300,
        };
        assert_eq!(elapsed(&session, t0()), 300);
        assert_eq!(elapsed(&session, t0() + Duration::hours(5)), 300);
    }

    #[test]
    fn elapsed_never_decreases_as_now_advances() {
        let session = Session {
            started_at: Some(t0()),
            accumulated_seconds: 7,
        };
        let mut previous = 0;
        for step in -5..500 {
            let current = elapsed(&session, t0() + Duration::milliseconds(step * 377));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(100 * 3600 + 5), "100:00:05");
    }
}
