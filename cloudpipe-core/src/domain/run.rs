//! Pipeline run domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A single launch of a pipeline (or of a bare tool image) on a cloud instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub pipeline_id: Option<Uuid>,
    pub version: Option<String>,
    pub owner: String,
    pub status: TaskStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub instance: RunInstance,
    pub prices: RunPrices,
    pub parameters: HashMap<String, String>,
    pub parent_run_id: Option<Uuid>,
    /// Status changes ordered by timestamp. Empty when not loaded.
    #[serde(default)]
    pub status_history: Vec<RunStatus>,
}

/// Cloud instance backing a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInstance {
    pub node_type: String,
    pub cloud_region: String,
    pub disk_size_gb: i32,
    pub spot: bool,
}

/// Hourly prices fixed at launch time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunPrices {
    pub compute_price_per_hour: Decimal,
    pub disk_price_per_hour: Decimal,
}

impl RunPrices {
    pub fn price_per_hour(&self) -> Decimal {
        self.compute_price_per_hour + self.disk_price_per_hour
    }
}

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Running,
    Pausing,
    Paused,
    Resuming,
    Stopped,
    Failure,
    Success,
}

impl TaskStatus {
    /// A run in a final status never changes again
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TaskStatus::Stopped | TaskStatus::Failure | TaskStatus::Success
        )
    }

    /// Whether the compute instance is up (and billed) in this status
    pub fn is_billable_compute(&self) -> bool {
        matches!(
            self,
            TaskStatus::Running | TaskStatus::Pausing | TaskStatus::Resuming
        )
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Running => matches!(next, Pausing | Stopped | Failure | Success),
            Pausing => matches!(next, Paused | Running | Failure),
            Paused => matches!(next, Resuming | Stopped),
            Resuming => matches!(next, Running | Paused | Failure),
            Stopped | Failure | Success => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "Running",
            TaskStatus::Pausing => "Pausing",
            TaskStatus::Paused => "Paused",
            TaskStatus::Resuming => "Resuming",
            TaskStatus::Stopped => "Stopped",
            TaskStatus::Failure => "Failure",
            TaskStatus::Success => "Success",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Running" => Some(TaskStatus::Running),
            "Pausing" => Some(TaskStatus::Pausing),
            "Paused" => Some(TaskStatus::Paused),
            "Resuming" => Some(TaskStatus::Resuming),
            "Stopped" => Some(TaskStatus::Stopped),
            "Failure" => Some(TaskStatus::Failure),
            "Success" => Some(TaskStatus::Success),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded status change of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub status: TaskStatus,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_statuses_are_terminal() {
        for status in [TaskStatus::Stopped, TaskStatus::Failure, TaskStatus::Success] {
            assert!(status.is_final());
            assert!(!status.can_transition_to(TaskStatus::Running));
        }
    }

    #[test]
    fn test_pause_resume_cycle() {
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Pausing));
        assert!(TaskStatus::Pausing.can_transition_to(TaskStatus::Paused));
        assert!(TaskStatus::Paused.can_transition_to(TaskStatus::Resuming));
        assert!(TaskStatus::Resuming.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Paused.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Paused));
    }

    #[test]
    fn test_status_string_mapping() {
        for status in [
            TaskStatus::Running,
            TaskStatus::Pausing,
            TaskStatus::Paused,
            TaskStatus::Resuming,
            TaskStatus::Stopped,
            TaskStatus::Failure,
            TaskStatus::Success,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("Unknown"), None);
    }

    #[test]
    fn test_price_per_hour_sums_compute_and_disk() {
        let prices = RunPrices {
            compute_price_per_hour: Decimal::new(96, 3),
            disk_price_per_hour: Decimal::new(14, 3),
        };
        assert_eq!(prices.price_per_hour(), Decimal::new(110, 3));
    }
}
