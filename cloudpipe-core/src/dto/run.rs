//! Pipeline run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::run::{PipelineRun, RunInstance, TaskStatus};

/// Request to launch a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRun {
    pub pipeline_id: Option<Uuid>,
    pub version: Option<String>,
    pub owner: String,
    pub instance: RunInstance,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    pub parent_run_id: Option<Uuid>,
}

impl LaunchRun {
    /// Launch request repeating an earlier run of the same pipeline
    pub fn repeat_of(run: &PipelineRun) -> Self {
        Self {
            pipeline_id: run.pipeline_id,
            version: run.version.clone(),
            owner: run.owner.clone(),
            instance: run.instance.clone(),
            parameters: run.parameters.clone(),
            parent_run_id: None,
        }
    }
}

/// Request to move a run to a new status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRunStatus {
    pub status: TaskStatus,
}

/// Time window query for runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Run summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub pipeline_id: Option<Uuid>,
    pub version: Option<String>,
    pub owner: String,
    pub status: TaskStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub node_type: String,
}

impl From<PipelineRun> for RunSummary {
    fn from(run: PipelineRun) -> Self {
        Self {
            id: run.id,
            pipeline_id: run.pipeline_id,
            version: run.version,
            owner: run.owner,
            status: run.status,
            start_date: run.start_date,
            end_date: run.end_date,
            node_type: run.instance.node_type,
        }
    }
}
