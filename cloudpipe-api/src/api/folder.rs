//! Folder API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use cloudpipe_core::domain::folder::Folder;
use cloudpipe_core::dto::folder::{CreateFolder, FolderHierarchy, RenameFolder};
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::folder_service;

/// POST /folder
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolder>,
) -> ApiResult<(StatusCode, Json<Folder>)> {
    tracing::info!("Creating folder: {}", req.name);

    let folder = folder_service::create_folder(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// GET /folder
/// Whole folder tree with the pipelines it holds
pub async fn folder_tree(State(state): State<AppState>) -> ApiResult<Json<FolderHierarchy>> {
    let tree = folder_service::folder_tree(&state.pool).await?;
    Ok(Json(tree))
}

/// GET /folder/{id}
pub async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Folder>> {
    let folder = folder_service::get_folder(&state.pool, id).await?;
    Ok(Json(folder))
}

/// PUT /folder/{id}
pub async fn rename_folder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameFolder>,
) -> ApiResult<Json<Folder>> {
    tracing::info!("Renaming folder {} to {}", id, req.name);

    let folder = folder_service::rename_folder(&state.pool, id, &req.name).await?;
    Ok(Json(folder))
}

/// DELETE /folder/{id}
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting folder: {}", id);

    folder_service::delete_folder(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
