//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management and pipeline sources.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cloudpipe_core::domain::pipeline::Pipeline;
use cloudpipe_core::dto::pipeline::{
    CommitResult, CommitSourceFile, CreatePipeline, MovePipeline, PipelineSummary,
    PipelineVersion, SourceEntry,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::pipeline_service;

#[derive(Debug, Deserialize)]
pub struct DeletePipelineQuery {
    #[serde(default)]
    pub delete_repository: bool,
}

#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub version: Option<String>,
    pub path: Option<String>,
}

/// POST /pipeline/create
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = pipeline_service::create_pipeline(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipeline/list
pub async fn list_pipelines(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PipelineSummary>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = pipeline_service::list_pipelines(&state.pool).await?;
    Ok(Json(pipelines.into_iter().map(Into::into).collect()))
}

/// GET /pipeline/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = pipeline_service::get_pipeline(&state.pool, id).await?;
    Ok(Json(pipeline))
}

/// PUT /pipeline/{id}
pub async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<Json<Pipeline>> {
    tracing::info!("Updating pipeline: {}", id);

    let pipeline = pipeline_service::update_pipeline(&state.pool, id, req).await?;
    Ok(Json(pipeline))
}

/// POST /pipeline/{id}/move
pub async fn move_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MovePipeline>,
) -> ApiResult<Json<Pipeline>> {
    let pipeline = pipeline_service::move_pipeline(&state.pool, id, req.folder_id).await?;
    Ok(Json(pipeline))
}

/// DELETE /pipeline/{id}?delete_repository=
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeletePipelineQuery>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    pipeline_service::delete_pipeline(&state.pool, id, query.delete_repository).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /pipeline/{id}/versions
/// Branches and tags of the pipeline repository
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<PipelineVersion>>> {
    let versions = pipeline_service::list_versions(&state.pool, id).await?;
    Ok(Json(versions))
}

/// GET /pipeline/{id}/source?version=&path=
pub async fn list_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SourceQuery>,
) -> ApiResult<Json<Vec<SourceEntry>>> {
    let entries = pipeline_service::list_source(&state.pool, id, query.version, query.path).await?;
    Ok(Json(entries))
}

/// GET /pipeline/{id}/file?version=&path=
/// Raw file contents
pub async fn get_source_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SourceQuery>,
) -> ApiResult<Vec<u8>> {
    let path = query
        .path
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'path' is required".to_string()))?;

    let content = pipeline_service::get_source_file(&state.pool, id, query.version, &path).await?;
    Ok(content)
}

/// PUT /pipeline/{id}/file
pub async fn commit_source_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommitSourceFile>,
) -> ApiResult<Json<CommitResult>> {
    tracing::info!("Committing {} to pipeline {}", req.path, id);

    let commit = pipeline_service::commit_source_file(&state.pool, id, req).await?;
    Ok(Json(CommitResult { commit }))
}
