//! Folder Repository
//!
//! Handles all database operations related to folders.

use cloudpipe_core::domain::folder::Folder;
use cloudpipe_core::dto::folder::CreateFolder;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new folder
pub async fn create(pool: &PgPool, req: CreateFolder) -> Result<Folder, sqlx::Error> {
    let folder = Folder {
        id: Uuid::new_v4(),
        name: req.name,
        parent_id: req.parent_id,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO folders (id, name, parent_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(folder.id)
    .bind(&folder.name)
    .bind(folder.parent_id)
    .bind(folder.created_at)
    .execute(pool)
    .await?;

    Ok(folder)
}

/// Find a folder by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Folder>, sqlx::Error> {
    let row = sqlx::query_as::<_, FolderRow>(
        "SELECT id, name, parent_id, created_at FROM folders WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// List all folders
pub async fn list_all(pool: &PgPool) -> Result<Vec<Folder>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FolderRow>(
        "SELECT id, name, parent_id, created_at FROM folders ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Rename a folder
pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE folders SET name = $1 WHERE id = $2")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Count nested folders and pipelines of a folder
pub async fn count_children(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM folders WHERE parent_id = $1)
             + (SELECT COUNT(*) FROM pipelines WHERE folder_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Delete a folder by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM folders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct FolderRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FolderRow> for Folder {
    fn from(row: FolderRow) -> Self {
        Folder {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            created_at: row.created_at,
        }
    }
}
