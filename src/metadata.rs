use crate::error::{Result, ScheduleError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Schedule-level inputs supplied alongside the task and dependency lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    /// Day zero of the offset space; root tasks start here.
    pub schedule_start_date: NaiveDate,
    /// Seeds the backward pass instead of the computed project finish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_finish_date: Option<NaiveDate>,
    /// Tasks whose total float is at or below this are critical.
    #[serde(default)]
    pub criticality_threshold_days: i64,
    /// Clamp negative early starts (from leads) to the schedule start.
    #[serde(default)]
    pub clamp_negative_offsets: bool,
}

impl Default for ScheduleParameters {
    fn default() -> Self {
        Self {
            schedule_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            target_finish_date: None,
            criticality_threshold_days: 0,
            clamp_negative_offsets: false,
        }
    }
}

impl ScheduleParameters {
    pub fn starting(schedule_start_date: NaiveDate) -> Self {
        Self {
            schedule_start_date,
            ..Self::default()
        }
    }

    pub fn with_target_finish(mut self, date: NaiveDate) -> Self {
        self.target_finish_date = Some(date);
        self
    }

    pub fn with_criticality_threshold(mut self, days: i64) -> Self {
        self.criticality_threshold_days = days;
        self
    }

    pub fn with_clamped_offsets(mut self) -> Self {
        self.clamp_negative_offsets = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(target) = self.target_finish_date {
            if target < self.schedule_start_date {
                return Err(ScheduleError::InvalidParameters(format!(
                    "target finish date {target} is before schedule start date {}",
                    self.schedule_start_date
                )));
            }
        }
        if self.criticality_threshold_days < 0 {
            return Err(ScheduleError::InvalidParameters(format!(
                "criticality threshold must not be negative (got {})",
                self.criticality_threshold_days
            )));
        }
        Ok(())
    }
}
