//! Transfer Service
//!
//! Lifecycle of file transfer tasks: `Created` → `Running` → `Success`/`Failure`.

use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::{CreateTransferTask, FinishTransfer};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::transfer_repository;

/// Service error type
#[derive(Debug)]
pub enum TransferError {
    NotFound(Uuid),
    InvalidState(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for TransferError {
    fn from(err: sqlx::Error) -> Self {
        TransferError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Create a transfer task
pub async fn create_transfer(pool: &PgPool, req: CreateTransferTask) -> Result<TransferTask> {
    if req.source.trim().is_empty() || req.destination.trim().is_empty() {
        return Err(TransferError::ValidationError(
            "Source and destination are required".to_string(),
        ));
    }

    if req.source == req.destination {
        return Err(TransferError::ValidationError(
            "Source and destination must differ".to_string(),
        ));
    }

    let task = transfer_repository::create(pool, req).await?;
    tracing::info!(
        "Transfer created: {} ({} -> {})",
        task.id,
        task.source,
        task.destination
    );

    Ok(task)
}

pub async fn get_transfer(pool: &PgPool, id: Uuid) -> Result<TransferTask> {
    let task = transfer_repository::find_by_id(pool, id)
        .await?
        .ok_or(TransferError::NotFound(id))?;

    Ok(task)
}

/// List tasks, optionally only those in one status
pub async fn list_transfers(
    pool: &PgPool,
    status: Option<TransferStatus>,
) -> Result<Vec<TransferTask>> {
    let tasks = match status {
        Some(status) => transfer_repository::list_by_status(pool, status).await?,
        None => transfer_repository::list_all(pool).await?,
    };
    Ok(tasks)
}

/// Claim a created task for a runner
pub async fn claim_transfer(pool: &PgPool, id: Uuid, runner_id: &str) -> Result<TransferTask> {
    if runner_id.trim().is_empty() {
        return Err(TransferError::ValidationError(
            "Runner id cannot be empty".to_string(),
        ));
    }

    if !transfer_repository::claim(pool, id, runner_id).await? {
        let task = get_transfer(pool, id).await?;
        return Err(TransferError::InvalidState(format!(
            "Transfer {} is {}, not Created",
            id, task.status
        )));
    }

    tracing::info!("Transfer {} claimed by {}", id, runner_id);

    get_transfer(pool, id).await
}

/// Store the outcome of a running task
pub async fn finish_transfer(pool: &PgPool, id: Uuid, req: FinishTransfer) -> Result<TransferTask> {
    validate_finish(&req)?;

    let finished = transfer_repository::finish(
        pool,
        id,
        &req.runner_id,
        req.status,
        req.reason.as_deref(),
    )
    .await?;

    if !finished {
        let task = get_transfer(pool, id).await?;
        if task.status != TransferStatus::Running {
            return Err(TransferError::InvalidState(format!(
                "Transfer {} is {}, not Running",
                id, task.status
            )));
        }
        return Err(TransferError::InvalidState(format!(
            "Transfer {} is claimed by {}, not {}",
            id,
            task.runner_id.as_deref().unwrap_or("nobody"),
            req.runner_id
        )));
    }

    tracing::info!(
        "Transfer {} finished with {} by {}",
        id,
        req.status,
        req.runner_id
    );

    get_transfer(pool, id).await
}

/// Delete a task that is not running
pub async fn delete_transfer(pool: &PgPool, id: Uuid) -> Result<()> {
    let task = get_transfer(pool, id).await?;
    if task.status == TransferStatus::Running {
        return Err(TransferError::InvalidState(format!(
            "Transfer {} is running",
            id
        )));
    }

    transfer_repository::delete(pool, id).await?;
    tracing::info!("Transfer deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_finish(req: &FinishTransfer) -> Result<()> {
    if req.runner_id.trim().is_empty() {
        return Err(TransferError::ValidationError(
            "Runner id cannot be empty".to_string(),
        ));
    }

    if !req.status.is_final() {
        return Err(TransferError::ValidationError(format!(
            "Invalid final status: {}",
            req.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_finish_status() {
        assert!(validate_finish(&FinishTransfer::success("dts-1")).is_ok());
        assert!(validate_finish(&FinishTransfer::failure("dts-1", "disk full")).is_ok());
        assert!(matches!(
            validate_finish(&FinishTransfer {
                runner_id: "dts-1".to_string(),
                status: TransferStatus::Running,
                reason: None,
            }),
            Err(TransferError::ValidationError(_))
        ));
        assert!(matches!(
            validate_finish(&FinishTransfer::success(" ")),
            Err(TransferError::ValidationError(_))
        ));
    }
}
