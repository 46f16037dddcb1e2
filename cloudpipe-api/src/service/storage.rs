//! Data Storage Service

use cloudpipe_core::domain::storage::DataStorage;
use cloudpipe_core::dto::storage::CreateDataStorage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::storage_repository;

/// Service error type
#[derive(Debug)]
pub enum StorageError {
    NotFound(Uuid),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Register a storage
pub async fn create_storage(pool: &PgPool, req: CreateDataStorage) -> Result<DataStorage> {
    validate_storage_request(&req)?;

    let storage = storage_repository::create(pool, req).await?;
    tracing::info!("Storage registered: {} ({})", storage.name, storage.id);

    Ok(storage)
}

pub async fn get_storage(pool: &PgPool, id: Uuid) -> Result<DataStorage> {
    let storage = storage_repository::find_by_id(pool, id)
        .await?
        .ok_or(StorageError::NotFound(id))?;

    Ok(storage)
}

pub async fn list_storages(pool: &PgPool) -> Result<Vec<DataStorage>> {
    let storages = storage_repository::list_all(pool).await?;
    Ok(storages)
}

/// Record the current size of a storage
pub async fn update_usage(pool: &PgPool, id: Uuid, size_bytes: i64) -> Result<DataStorage> {
    if size_bytes < 0 {
        return Err(StorageError::ValidationError(format!(
            "Storage size cannot be negative: {}",
            size_bytes
        )));
    }

    let updated = storage_repository::update_usage(pool, id, size_bytes).await?;
    if !updated {
        return Err(StorageError::NotFound(id));
    }

    get_storage(pool, id).await
}

pub async fn delete_storage(pool: &PgPool, id: Uuid) -> Result<()> {
    let deleted = storage_repository::delete(pool, id).await?;
    if !deleted {
        return Err(StorageError::NotFound(id));
    }

    tracing::info!("Storage deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_storage_request(req: &CreateDataStorage) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(StorageError::ValidationError(
            "Storage name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 255 {
        return Err(StorageError::ValidationError(
            "Storage name is too long (max 255 characters)".to_string(),
        ));
    }

    if req.cloud_region.trim().is_empty() {
        return Err(StorageError::ValidationError(
            "Cloud region cannot be empty".to_string(),
        ));
    }

    if req.path.trim().is_empty() {
        return Err(StorageError::ValidationError(
            "Storage path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpipe_core::domain::storage::StorageKind;

    #[test]
    fn test_validate_storage_request() {
        let mut req = CreateDataStorage {
            name: "raw-reads".to_string(),
            kind: StorageKind::ObjectStorage,
            cloud_region: "us-east-1".to_string(),
            path: "s3://lab-raw-reads".to_string(),
        };
        assert!(validate_storage_request(&req).is_ok());

        req.path = " ".to_string();
        assert!(matches!(
            validate_storage_request(&req),
            Err(StorageError::ValidationError(_))
        ));
    }
}
