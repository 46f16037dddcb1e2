//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::{
    folder_service::FolderError, offer_service::OfferError, pipeline_service::PipelineError,
    run_service::RunError, schedule_service::ScheduleError, storage_service::StorageError,
    transfer_service::TransferError,
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Unique and foreign key violations are caller mistakes
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::Conflict(db_err.message().to_string());
            }
        }
        ApiError::DatabaseError(err)
    }
}

impl From<FolderError> for ApiError {
    fn from(err: FolderError) -> Self {
        match err {
            FolderError::NotFound(id) => ApiError::NotFound(format!("Folder {} not found", id)),
            FolderError::ParentNotFound(id) => {
                ApiError::BadRequest(format!("Parent folder {} not found", id))
            }
            FolderError::NotEmpty(id) => ApiError::Conflict(format!("Folder {} is not empty", id)),
            FolderError::ValidationError(msg) => ApiError::BadRequest(msg),
            FolderError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            PipelineError::FolderNotFound(id) => {
                ApiError::BadRequest(format!("Folder {} not found", id))
            }
            PipelineError::AlreadyExists(name) => {
                ApiError::Conflict(format!("Pipeline '{}' already exists", name))
            }
            PipelineError::ValidationError(msg) => ApiError::BadRequest(msg),
            PipelineError::GitError(err) if err.is_not_found() => ApiError::NotFound(err.to_string()),
            PipelineError::GitError(
                cloudpipe_git::GitError::InvalidRepository(msg)
                | cloudpipe_git::GitError::InvalidPath(msg),
            ) => ApiError::BadRequest(msg),
            PipelineError::GitError(err) => ApiError::BadGateway(err.to_string()),
            PipelineError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::NotFound(id) => ApiError::NotFound(format!("Run {} not found", id)),
            RunError::PipelineNotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            RunError::InvalidState(msg) => ApiError::Conflict(msg),
            RunError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(id) => ApiError::NotFound(format!("Schedule {} not found", id)),
            ScheduleError::TargetNotFound(target) => ApiError::BadRequest(format!(
                "{} {} not found",
                target.kind_str(),
                target.id()
            )),
            ScheduleError::ValidationError(msg) => ApiError::BadRequest(msg),
            ScheduleError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<OfferError> for ApiError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::ValidationError(msg) => ApiError::BadRequest(msg),
            OfferError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => ApiError::NotFound(format!("Storage {} not found", id)),
            StorageError::ValidationError(msg) => ApiError::BadRequest(msg),
            StorageError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::NotFound(id) => {
                ApiError::NotFound(format!("Transfer {} not found", id))
            }
            TransferError::InvalidState(msg) => ApiError::Conflict(msg),
            TransferError::ValidationError(msg) => ApiError::BadRequest(msg),
            TransferError::DatabaseError(err) => err.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(status_of(FolderError::NotEmpty(id)), StatusCode::CONFLICT);
        assert_eq!(status_of(FolderError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(PipelineError::AlreadyExists("rnaseq".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PipelineError::GitError(cloudpipe_git::GitError::api_error(500, "boom"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PipelineError::GitError(cloudpipe_git::GitError::NotFound("main.nf".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PipelineError::GitError(cloudpipe_git::GitError::InvalidPath(
                "../admin".into()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RunError::InvalidState("final".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RunError::ValidationError("no offer".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(TransferError::InvalidState("claimed".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(sqlx::Error::RowNotFound),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
