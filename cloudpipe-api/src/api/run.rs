//! Run API Handlers
//!
//! HTTP endpoints for run launching and lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cloudpipe_core::domain::run::PipelineRun;
use cloudpipe_core::dto::run::{LaunchRun, RunFilter, RunSummary, UpdateRunStatus};
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

// =============================================================================
// Run Lifecycle Endpoints
// =============================================================================

/// POST /run
pub async fn launch_run(
    State(state): State<AppState>,
    Json(req): Json<LaunchRun>,
) -> ApiResult<(StatusCode, Json<PipelineRun>)> {
    tracing::info!(
        "Launching run for {} on {}",
        req.pipeline_id
            .map_or_else(|| "tool".to_string(), |id| id.to_string()),
        req.instance.node_type
    );

    let run = run_service::launch_run(&state.pool, &state.pricing, req).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /run/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&state.pool, id).await?;
    Ok(Json(run))
}

/// DELETE /run/{id}
pub async fn delete_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    run_service::delete_run(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /run/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRunStatus>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::info!("Updating run {} to {}", id, req.status);

    let run = run_service::update_status(&state.pool, id, req.status).await?;
    Ok(Json(run))
}

/// POST /run/{id}/stop
pub async fn stop_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let run = run_service::stop_run(&state.pool, id).await?;
    Ok(Json(run))
}

/// POST /run/{id}/pause
pub async fn pause_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let run = run_service::pause_run(&state.pool, id).await?;
    Ok(Json(run))
}

/// POST /run/{id}/resume
pub async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    let run = run_service::resume_run(&state.pool, id).await?;
    Ok(Json(run))
}

// =============================================================================
// Run Queries
// =============================================================================

/// GET /run/filter?from=&to=
/// Runs alive during the period, with status histories (used by billing)
pub async fn list_runs_in_period(
    State(state): State<AppState>,
    Query(filter): Query<RunFilter>,
) -> ApiResult<Json<Vec<PipelineRun>>> {
    tracing::debug!("Listing runs between {} and {}", filter.from, filter.to);

    let runs = run_service::list_runs_in_period(&state.pool, filter.from, filter.to).await?;
    Ok(Json(runs))
}

/// GET /run/active
pub async fn list_active_runs(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RunSummary>>> {
    let runs = run_service::list_active_runs(&state.pool).await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}

/// GET /run/pipeline/{pipeline_id}
pub async fn list_runs_by_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RunSummary>>> {
    let runs = run_service::list_runs_by_pipeline(&state.pool, pipeline_id).await?;
    Ok(Json(runs.into_iter().map(Into::into).collect()))
}
