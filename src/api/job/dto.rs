use serde::Serialize;

use crate::engine::{CompletionRecord, JobSettings, JobView, PayoutOption};

/// Response for single job creation or update
#[derive(Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: JobView,
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobView>,
}

/// Error details for a job that failed validation during import
#[derive(Serialize)]
pub struct JobError {
    pub title: String,
    pub errors: Vec<String>,
}

/// Response for bulk job import
#[derive(Serialize)]
pub struct BulkJobResponse {
    pub message: String,
    pub created: usize,
    pub errors: Vec<JobError>,
}

#[derive(Serialize)]
pub struct CompletionListResponse {
    pub completions: Vec<CompletionRecord>,
}

#[derive(Serialize)]
pub struct PayoutListResponse {
    pub options: Vec<PayoutOption>,
}

/// Settings with the display labels the dashboard shows
#[derive(Serialize)]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: JobSettings,
    pub minimum_hourly_wage_display: String,
    pub daily_reset_label: String,
    pub reset_summary: String,
}

impl From<JobSettings> for SettingsResponse {
    fn from(settings: JobSettings) -> Self {
        let label = reset_label(settings.daily_reset_hour);
        SettingsResponse {
            minimum_hourly_wage_display: settings.minimum_hourly_wage.to_string(),
            reset_summary: format!("Job limits refresh each day at {}.", label),
            daily_reset_label: label,
            settings,
        }
    }
}

/// `0` -> `12:00 AM`, `13` -> `01:00 PM`
fn reset_label(hour: u32) -> String {
    let hour = hour.min(23);
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{:02}:00 {}", display_hour, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_labels_use_twelve_hour_clock() {
        assert_eq!(reset_label(0), "12:00 AM");
        assert_eq!(reset_label(9), "09:00 AM");
        assert_eq!(reset_label(12), "12:00 PM");
        assert_eq!(reset_label(23), "11:00 PM");
    }
}
