//! Schedule API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cloudpipe_core::domain::schedule::ScheduleTarget;
use cloudpipe_core::dto::schedule::{CreateSchedule, ScheduleInfo};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::schedule_service;

/// POST /schedule
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateSchedule>,
) -> ApiResult<(StatusCode, Json<ScheduleInfo>)> {
    tracing::info!(
        "Creating {} schedule for {} {}",
        req.action,
        req.target.kind_str(),
        req.target.id()
    );

    let schedule = schedule_service::create_schedule(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Optional target filter; `run_id` wins when both are given
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub run_id: Option<Uuid>,
    pub pipeline_id: Option<Uuid>,
}

/// GET /schedule?run_id=|pipeline_id=
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<Vec<ScheduleInfo>>> {
    let target = query
        .run_id
        .map(ScheduleTarget::Run)
        .or(query.pipeline_id.map(ScheduleTarget::Pipeline));

    let schedules = match target {
        Some(target) => schedule_service::list_for_target(&state.pool, target).await?,
        None => schedule_service::list_schedules(&state.pool).await?,
    };
    Ok(Json(schedules))
}

/// GET /schedule/{id}
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ScheduleInfo>> {
    let schedule = schedule_service::get_schedule(&state.pool, id).await?;
    Ok(Json(schedule))
}

/// DELETE /schedule/{id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    schedule_service::delete_schedule(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
