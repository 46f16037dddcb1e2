//! Data Storage API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use cloudpipe_core::domain::storage::DataStorage;
use cloudpipe_core::dto::storage::{CreateDataStorage, UpdateStorageUsage};
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::storage_service;

/// POST /storage
pub async fn create_storage(
    State(state): State<AppState>,
    Json(req): Json<CreateDataStorage>,
) -> ApiResult<(StatusCode, Json<DataStorage>)> {
    tracing::info!("Registering storage: {}", req.name);

    let storage = storage_service::create_storage(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(storage)))
}

/// GET /storage
pub async fn list_storages(State(state): State<AppState>) -> ApiResult<Json<Vec<DataStorage>>> {
    let storages = storage_service::list_storages(&state.pool).await?;
    Ok(Json(storages))
}

/// GET /storage/{id}
pub async fn get_storage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DataStorage>> {
    let storage = storage_service::get_storage(&state.pool, id).await?;
    Ok(Json(storage))
}

/// PUT /storage/{id}/usage
pub async fn update_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStorageUsage>,
) -> ApiResult<Json<DataStorage>> {
    let storage = storage_service::update_usage(&state.pool, id, req.size_bytes).await?;
    Ok(Json(storage))
}

/// DELETE /storage/{id}
pub async fn delete_storage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    storage_service::delete_storage(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
