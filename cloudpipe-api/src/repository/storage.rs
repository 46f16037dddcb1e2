//! Data Storage Repository

use cloudpipe_core::domain::storage::{DataStorage, StorageKind};
use cloudpipe_core::dto::storage::CreateDataStorage;
use sqlx::PgPool;
use uuid::Uuid;

/// Register a new storage
pub async fn create(pool: &PgPool, req: CreateDataStorage) -> Result<DataStorage, sqlx::Error> {
    let storage = DataStorage {
        id: Uuid::new_v4(),
        name: req.name,
        kind: req.kind,
        cloud_region: req.cloud_region,
        path: req.path,
        size_bytes: 0,
        usage_updated_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO data_storages (id, name, kind, cloud_region, path, size_bytes)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(storage.id)
    .bind(&storage.name)
    .bind(storage.kind.as_str())
    .bind(&storage.cloud_region)
    .bind(&storage.path)
    .bind(storage.size_bytes)
    .execute(pool)
    .await?;

    Ok(storage)
}

/// Find a storage by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DataStorage>, sqlx::Error> {
    let row = sqlx::query_as::<_, StorageRow>(
        r#"
        SELECT id, name, kind, cloud_region, path, size_bytes, usage_updated_at
        FROM data_storages
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// List all storages
pub async fn list_all(pool: &PgPool) -> Result<Vec<DataStorage>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StorageRow>(
        r#"
        SELECT id, name, kind, cloud_region, path, size_bytes, usage_updated_at
        FROM data_storages
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Record the current size of a storage
pub async fn update_usage(pool: &PgPool, id: Uuid, size_bytes: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE data_storages SET size_bytes = $1, usage_updated_at = $2 WHERE id = $3",
    )
    .bind(size_bytes)
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a storage by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM data_storages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StorageRow {
    id: Uuid,
    name: String,
    kind: String,
    cloud_region: String,
    path: String,
    size_bytes: i64,
    usage_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<StorageRow> for DataStorage {
    fn from(row: StorageRow) -> Self {
        DataStorage {
            id: row.id,
            name: row.name,
            kind: StorageKind::parse(&row.kind).unwrap_or(StorageKind::ObjectStorage),
            cloud_region: row.cloud_region,
            path: row.path,
            size_bytes: row.size_bytes,
            usage_updated_at: row.usage_updated_at,
        }
    }
}
