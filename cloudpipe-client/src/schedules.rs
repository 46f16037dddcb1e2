//! Schedule-related API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::schedule::ScheduleTarget;
use cloudpipe_core::dto::schedule::{CreateSchedule, ScheduleInfo};
use uuid::Uuid;

impl ApiClient {
    pub async fn create_schedule(&self, req: CreateSchedule) -> Result<ScheduleInfo> {
        let url = format!("{}/schedule", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List schedules, optionally only those of one run or pipeline
    pub async fn list_schedules(&self, target: Option<ScheduleTarget>) -> Result<Vec<ScheduleInfo>> {
        let url = format!("{}/schedule", self.base_url);
        let mut request = self.client.get(&url);
        match target {
            Some(ScheduleTarget::Run(id)) => request = request.query(&[("run_id", id)]),
            Some(ScheduleTarget::Pipeline(id)) => request = request.query(&[("pipeline_id", id)]),
            None => {}
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<ScheduleInfo> {
        let url = format!("{}/schedule/{}", self.base_url, schedule_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        let url = format!("{}/schedule/{}", self.base_url, schedule_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
