//! Run schedule DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::schedule::{RunSchedule, ScheduleAction, ScheduleTarget};

/// Request to create a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub target: ScheduleTarget,
    pub action: ScheduleAction,
    pub cron_expression: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// Schedule together with its next firing time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInfo {
    #[serde(flatten)]
    pub schedule: RunSchedule,
    pub next_fire_at: Option<DateTime<Utc>>,
}
