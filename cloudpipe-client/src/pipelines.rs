//! Pipeline-related API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::pipeline::Pipeline;
use cloudpipe_core::dto::pipeline::{
    CommitResult, CommitSourceFile, CreatePipeline, MovePipeline, PipelineSummary,
    PipelineVersion, SourceEntry,
};
use uuid::Uuid;

impl ApiClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Create a new pipeline
    pub async fn create_pipeline(&self, req: CreatePipeline) -> Result<Pipeline> {
        let url = format!("{}/pipeline/create", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List all pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let url = format!("{}/pipeline/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline by ID
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        let url = format!("{}/pipeline/{}", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Replace a pipeline's attributes
    pub async fn update_pipeline(&self, pipeline_id: Uuid, req: CreatePipeline) -> Result<Pipeline> {
        let url = format!("{}/pipeline/{}", self.base_url, pipeline_id);
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Move a pipeline into a folder, or to the root with `None`
    pub async fn move_pipeline(&self, pipeline_id: Uuid, folder_id: Option<Uuid>) -> Result<Pipeline> {
        let url = format!("{}/pipeline/{}/move", self.base_url, pipeline_id);
        let response = self
            .client
            .put(&url)
            .json(&MovePipeline { folder_id })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a pipeline, optionally together with its repository
    pub async fn delete_pipeline(&self, pipeline_id: Uuid, delete_repository: bool) -> Result<()> {
        let url = format!("{}/pipeline/{}", self.base_url, pipeline_id);
        let response = self
            .client
            .delete(&url)
            .query(&[("delete_repository", delete_repository)])
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Pipeline Sources
    // =============================================================================

    /// Branches and tags of the pipeline repository
    pub async fn list_versions(&self, pipeline_id: Uuid) -> Result<Vec<PipelineVersion>> {
        let url = format!("{}/pipeline/{}/versions", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// One directory level of the pipeline sources
    pub async fn list_source(
        &self,
        pipeline_id: Uuid,
        version: Option<&str>,
        path: Option<&str>,
    ) -> Result<Vec<SourceEntry>> {
        let url = format!("{}/pipeline/{}/source", self.base_url, pipeline_id);
        let response = self
            .client
            .get(&url)
            .query(&source_query(version, path))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Raw contents of one source file
    pub async fn get_source_file(
        &self,
        pipeline_id: Uuid,
        version: Option<&str>,
        path: &str,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/pipeline/{}/file", self.base_url, pipeline_id);
        let response = self
            .client
            .get(&url)
            .query(&source_query(version, Some(path)))
            .send()
            .await?;

        self.handle_bytes_response(response).await
    }

    /// Commit one source file, returning the new commit id
    pub async fn commit_source_file(
        &self,
        pipeline_id: Uuid,
        req: CommitSourceFile,
    ) -> Result<String> {
        let url = format!("{}/pipeline/{}/file", self.base_url, pipeline_id);
        let response = self.client.put(&url).json(&req).send().await?;

        let result: CommitResult = self.handle_response(response).await?;
        Ok(result.commit)
    }
}

fn source_query<'a>(version: Option<&'a str>, path: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
    let mut query = Vec::new();
    if let Some(version) = version {
        query.push(("version", version));
    }
    if let Some(path) = path {
        query.push(("path", path));
    }
    query
}

#[cfg(test)]
mod tests {
    use crate::ApiClient;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_pipelines() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/pipeline/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": id,
                "name": "rnaseq",
                "description": null,
                "folder_id": null,
                "updated_at": "2024-03-01T10:00:00Z",
                "tags": ["ngs"]
            }])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let pipelines = client.list_pipelines().await.unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].id, id);
        assert_eq!(pipelines[0].tags, vec!["ngs"]);
    }

    #[tokio::test]
    async fn test_get_source_file_returns_raw_bytes() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path(format!("/pipeline/{}/file", id)))
            .and(query_param("version", "v1.2"))
            .and(query_param("path", "main.nf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"workflow {}".to_vec()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let content = client
            .get_source_file(id, Some("v1.2"), "main.nf")
            .await
            .unwrap();
        assert_eq!(content, b"workflow {}");
    }

    #[tokio::test]
    async fn test_get_missing_pipeline_is_not_found() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path(format!("/pipeline/{}", id)))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "error": format!("Pipeline {} not found", id) })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.get_pipeline(id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_move_pipeline_uses_put() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        let folder_id = Uuid::new_v4();

        Mock::given(method("PUT"))
            .and(path(format!("/pipeline/{}/move", id)))
            .and(body_json(json!({ "folder_id": folder_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "name": "rnaseq",
                "description": null,
                "folder_id": folder_id,
                "repository": null,
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-02T10:00:00Z",
                "tags": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let pipeline = client.move_pipeline(id, Some(folder_id)).await.unwrap();
        assert_eq!(pipeline.folder_id, Some(folder_id));
    }
}
