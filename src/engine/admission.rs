use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Serialize, Serializer};

/// Daily completion capacity of one job.
///
/// `completed_today` only moves through [`Quota::admit`] (up) and the
/// rollover reset (back to zero). Callers hold the job's lock for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    daily_limit: Option<u32>,
    completed_today: u32,
    last_reset: DateTime<Utc>,
}

/// Completions left for today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Limited(u32),
    Unlimited,
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Limited(n) => serializer.serialize_u32(*n),
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Successful admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub completed_today: u32,
    pub remaining: Remaining,
}

/// The job has used its whole daily allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub limit: u32,
}

impl Quota {
    pub fn new(daily_limit: Option<u32>, last_reset: DateTime<Utc>) -> Self {
        Self {
            daily_limit: normalize_limit(daily_limit),
            completed_today: 0,
            last_reset,
        }
    }

    pub fn daily_limit(&self) -> Option<u32> {
        self.daily_limit
    }

    pub fn completed_today(&self) -> u32 {
        self.completed_today
    }

    pub fn last_reset(&self) -> DateTime<Utc> {
        self.last_reset
    }

    pub fn remaining(&self) -> Remaining {
        match self.daily_limit {
            Some(limit) => Remaining::Limited(limit.saturating_sub(self.completed_today)),
            None => Remaining::Unlimited,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Remaining::Limited(0)
    }

    /// Check-and-increment in one step. Exclusive access (`&mut self`)
    /// is what makes the pair atomic with respect to other admits.
    pub fn admit(&mut self) -> Result<Grant, CapacityExceeded> {
        if let Some(limit) = self.daily_limit {
            if self.completed_today >= limit {
                return Err(CapacityExceeded { limit });
            }
        }

        self.completed_today += 1;
        Ok(Grant {
            completed_today: self.completed_today,
            remaining: self.remaining(),
        })
    }

    /// Replace the limit, clamping the counter so it never exceeds it
    pub fn set_limit(&mut self, daily_limit: Option<u32>) {
        self.daily_limit = normalize_limit(daily_limit);
        if let Some(limit) = self.daily_limit {
            self.completed_today = self.completed_today.min(limit);
        }
    }

    /// Reset the counter once `now` has crossed the next reset boundary.
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, now: DateTime<Utc>, reset_hour: u32) -> bool {
        let boundary = reset_boundary(now, reset_hour);
        if self.last_reset >= boundary {
            return false;
        }
        self.completed_today = 0;
        self.last_reset = boundary;
        true
    }

    /// Move the anchor to the current boundary without touching the counter
    pub fn reanchor(&mut self, now: DateTime<Utc>, reset_hour: u32) {
        self.last_reset = reset_boundary(now, reset_hour);
    }

    /// Start from a counter carried over from elsewhere (seed data)
    pub fn with_completed(mut self, completed_today: u32) -> Self {
        self.completed_today = match self.daily_limit {
            Some(limit) => completed_today.min(limit),
            None => completed_today,
        };
        self
    }
}

/// Zero means no limit
fn normalize_limit(daily_limit: Option<u32>) -> Option<u32> {
    daily_limit.filter(|limit| *limit > 0)
}

/// Most recent instant at `reset_hour:00:00` UTC not after `moment`
pub fn reset_boundary(moment: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    let hour = reset_hour.min(23);
    let boundary = moment
        .with_hour(hour)
        .and_then(|m| m.with_minute(0))
        .and_then(|m| m.with_second(0))
        .and_then(|m| m.with_nanosecond(0))
        .unwrap_or(moment);

    if moment.hour() < hour {
        boundary - Duration::days(1)
    } else {
        boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn unlimited_quota_always_admits() {
        let mut quota = Quota::new(None, at(14, 0, 0));
        for n in 1..=50 {
            assert_eq!(quota.admit().unwrap().completed_today, n);
        }
        assert_eq!(quota.remaining(), Remaining::Unlimited);
    }

    #[test]
    fn last_slot_is_granted_once() {
        let mut quota = Quota::new(Some(2), at(14, 0, 0)).with_completed(1);
        let grant = quota.admit().unwrap();
        assert_eq!(grant.completed_today, 2);
        assert_eq!(grant.remaining, Remaining::Limited(0));
        assert!(quota.is_exhausted());

        assert_eq!(quota.admit(), Err(CapacityExceeded { limit: 2 }));
        assert_eq!(quota.completed_today(), 2);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let quota = Quota::new(Some(0), at(14, 0, 0));
        assert_eq!(quota.daily_limit(), None);
    }

    #[test]
    fn lowering_limit_clamps_counter() {
        let mut quota = Quota::new(Some(5), at(14, 0, 0)).with_completed(4);
        quota.set_limit(Some(2));
        assert_eq!(quota.completed_today(), 2);
        assert!(quota.is_exhausted());
    }

    #[test]
    fn boundary_before_reset_hour_is_previous_day() {
        assert_eq!(reset_boundary(at(14, 5, 30), 6), at(13, 6, 0));
        assert_eq!(reset_boundary(at(14, 6, 0), 6), at(14, 6, 0));
        assert_eq!(reset_boundary(at(14, 23, 59), 0), at(14, 0, 0));
    }

    #[test]
    fn roll_over_resets_once_per_boundary() {
        let mut quota = Quota::new(Some(3), at(14, 0, 0)).with_completed(3);
        assert!(!quota.roll_over(at(14, 22, 0), 0));
        assert_eq!(quota.completed_today(), 3);

        assert!(quota.roll_over(at(15, 0, 1), 0));
        assert_eq!(quota.completed_today(), 0);
        assert_eq!(quota.last_reset(), at(15, 0, 0));

        quota.admit().unwrap();
        assert!(!quota.roll_over(at(15, 12, 0), 0));
        assert_eq!(quota.completed_today(), 1);
    }

    #[test]
    fn remaining_serializes_as_number_or_unlimited() {
        assert_eq!(
            serde_json::to_value(Remaining::Limited(2)).unwrap(),
            serde_json::json!(2)
        );
        assert_eq!(
            serde_json::to_value(Remaining::Unlimited).unwrap(),
            serde_json::json!("unlimited")
        );
    }
}
