use serde::Serialize;

use super::earnings::Money;
use super::error::EngineError;

/// Rules that shape every job on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSettings {
    /// Floor for time-based rates
    pub minimum_hourly_wage: Money,
    /// Limit given to new jobs that do not name one; 0 means unlimited
    pub default_daily_limit: u32,
    /// UTC hour at which daily counters reset
    pub daily_reset_hour: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            minimum_hourly_wage: Money::from_cents(1500),
            default_daily_limit: 3,
            daily_reset_hour: 0,
        }
    }
}

/// Partial settings change; absent fields stay as they are
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub minimum_hourly_wage: Option<Money>,
    pub default_daily_limit: Option<u32>,
    pub daily_reset_hour: Option<u32>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(wage) = self.minimum_hourly_wage {
            if !wage.is_positive() {
                return Err(EngineError::InvalidJob(
                    "Minimum wage must be greater than zero.".to_string(),
                ));
            }
        }
        if let Some(hour) = self.daily_reset_hour {
            if hour > 23 {
                return Err(EngineError::InvalidJob(
                    "Reset hour must be between 0 and 23.".to_string(),
                ));
            }
        }
        Ok(())
    }
}
