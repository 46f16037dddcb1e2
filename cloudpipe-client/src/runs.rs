//! Run-related API endpoints

use crate::ApiClient;
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use cloudpipe_core::domain::run::{PipelineRun, TaskStatus};
use cloudpipe_core::dto::run::{LaunchRun, RunSummary, UpdateRunStatus};
use uuid::Uuid;

impl ApiClient {
    // =============================================================================
    // Run Lifecycle
    // =============================================================================

    /// Launch a run
    pub async fn launch_run(&self, req: LaunchRun) -> Result<PipelineRun> {
        let url = format!("{}/run", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a run with its status history
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = format!("{}/run/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Move a run to a new status
    pub async fn update_run_status(&self, run_id: Uuid, status: TaskStatus) -> Result<PipelineRun> {
        let url = format!("{}/run/{}/status", self.base_url, run_id);
        let response = self
            .client
            .post(&url)
            .json(&UpdateRunStatus { status })
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn stop_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        self.run_action(run_id, "stop").await
    }

    pub async fn pause_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        self.run_action(run_id, "pause").await
    }

    pub async fn resume_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        self.run_action(run_id, "resume").await
    }

    async fn run_action(&self, run_id: Uuid, action: &str) -> Result<PipelineRun> {
        let url = format!("{}/run/{}/{}", self.base_url, run_id, action);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Run Queries
    // =============================================================================

    /// Runs alive at some point of `[from, to)`, with status histories
    pub async fn list_runs_in_period(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PipelineRun>> {
        let url = format!("{}/run/filter", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Runs that have not finished
    pub async fn list_active_runs(&self) -> Result<Vec<RunSummary>> {
        let url = format!("{}/run/active", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Runs of a pipeline, newest first
    pub async fn list_runs_by_pipeline(&self, pipeline_id: Uuid) -> Result<Vec<RunSummary>> {
        let url = format!("{}/run/pipeline/{}", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::ApiClient;
    use chrono::TimeZone;
    use cloudpipe_core::domain::run::TaskStatus;
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn run_json(id: Uuid, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "pipeline_id": null,
            "version": null,
            "owner": "alice",
            "status": status,
            "start_date": "2024-03-01T08:00:00Z",
            "end_date": null,
            "instance": {
                "node_type": "m5.large",
                "cloud_region": "us-east-1",
                "disk_size_gb": 50,
                "spot": false
            },
            "prices": {
                "compute_price_per_hour": "0.096",
                "disk_price_per_hour": "0.006849"
            },
            "parameters": { "reads": "s3://bucket/reads" },
            "parent_run_id": null,
            "status_history": [
                { "status": "Running", "timestamp": "2024-03-01T08:00:00Z" }
            ]
        })
    }

    #[tokio::test]
    async fn test_list_runs_in_period_sends_window() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/run/filter"))
            .and(query_param("from", "2024-03-01T00:00:00Z"))
            .and(query_param("to", "2024-03-02T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([run_json(id, "Running")])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let from = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let to = chrono::Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let runs = client.list_runs_in_period(from, to).await.unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, id);
        assert_eq!(runs[0].prices.compute_price_per_hour, Decimal::new(96, 3));
        assert_eq!(runs[0].status_history.len(), 1);
    }

    #[tokio::test]
    async fn test_pause_run() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/run/{}/pause", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json(id, "Paused")))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let run = client.pause_run(id).await.unwrap();
        assert_eq!(run.status, TaskStatus::Paused);
    }
}
