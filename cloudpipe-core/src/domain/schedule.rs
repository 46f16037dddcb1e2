//! Run schedule domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cron-triggered action on a run or a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSchedule {
    pub id: Uuid,
    pub target: ScheduleTarget,
    pub action: ScheduleAction,
    /// Five-field cron expression (minute hour day-of-month month day-of-week)
    pub cron_expression: String,
    /// IANA time zone name the expression is evaluated in
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
}

/// What a schedule acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ScheduleTarget {
    Run(Uuid),
    Pipeline(Uuid),
}

impl ScheduleTarget {
    pub fn id(&self) -> Uuid {
        match self {
            ScheduleTarget::Run(id) | ScheduleTarget::Pipeline(id) => *id,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ScheduleTarget::Run(_) => "Run",
            ScheduleTarget::Pipeline(_) => "Pipeline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleAction {
    Pause,
    Resume,
    Run,
}

impl ScheduleAction {
    /// Pause/Resume only make sense for runs, Run only for pipelines
    pub fn applies_to(&self, target: &ScheduleTarget) -> bool {
        match (self, target) {
            (ScheduleAction::Pause | ScheduleAction::Resume, ScheduleTarget::Run(_)) => true,
            (ScheduleAction::Run, ScheduleTarget::Pipeline(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleAction::Pause => "Pause",
            ScheduleAction::Resume => "Resume",
            ScheduleAction::Run => "Run",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pause" => Some(ScheduleAction::Pause),
            "Resume" => Some(ScheduleAction::Resume),
            "Run" => Some(ScheduleAction::Run),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
