//! Transfer API Handlers
//!
//! Endpoints used by operators to queue transfers and by transfer runners
//! to claim and finish them.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::{ClaimTransfer, CreateTransferTask, FinishTransfer};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::transfer_service;

#[derive(Debug, Deserialize)]
pub struct TransferQuery {
    pub status: Option<TransferStatus>,
}

/// POST /transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(req): Json<CreateTransferTask>,
) -> ApiResult<(StatusCode, Json<TransferTask>)> {
    let task = transfer_service::create_transfer(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /transfer?status=
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<TransferQuery>,
) -> ApiResult<Json<Vec<TransferTask>>> {
    let tasks = transfer_service::list_transfers(&state.pool, query.status).await?;
    Ok(Json(tasks))
}

/// GET /transfer/{id}
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TransferTask>> {
    let task = transfer_service::get_transfer(&state.pool, id).await?;
    Ok(Json(task))
}

/// POST /transfer/{id}/claim
pub async fn claim_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimTransfer>,
) -> ApiResult<Json<TransferTask>> {
    tracing::debug!("Runner {} claiming transfer {}", req.runner_id, id);

    let task = transfer_service::claim_transfer(&state.pool, id, &req.runner_id).await?;
    Ok(Json(task))
}

/// POST /transfer/{id}/finish
pub async fn finish_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FinishTransfer>,
) -> ApiResult<Json<TransferTask>> {
    let task = transfer_service::finish_transfer(&state.pool, id, req).await?;
    Ok(Json(task))
}

/// DELETE /transfer/{id}
pub async fn delete_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    transfer_service::delete_transfer(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
