//! Pipeline Repository
//!
//! Handles all database operations related to pipelines.

use cloudpipe_core::domain::pipeline::{Pipeline, RepositoryKind, RepositoryRef};
use cloudpipe_core::dto::pipeline::CreatePipeline;
use sqlx::PgPool;
use uuid::Uuid;

const PIPELINE_COLUMNS: &str = r#"
    id, name, description, folder_id, repository_kind, repository_url,
    repository_project, repository_token, created_at, updated_at, tags
"#;

/// Create a new pipeline in the database
pub async fn create(pool: &PgPool, req: CreatePipeline) -> Result<Pipeline, sqlx::Error> {
    let now = chrono::Utc::now();

    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        folder_id: req.folder_id,
        repository: req.repository,
        created_at: now,
        updated_at: now,
        tags: req.tags,
    };
    let repo = RepositoryColumns::from(pipeline.repository.as_ref());

    sqlx::query(
        r#"
        INSERT INTO pipelines (
            id, name, description, folder_id, repository_kind, repository_url,
            repository_project, repository_token, created_at, updated_at, tags
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(pipeline.id)
    .bind(&pipeline.name)
    .bind(&pipeline.description)
    .bind(pipeline.folder_id)
    .bind(repo.kind)
    .bind(repo.url)
    .bind(repo.project)
    .bind(repo.token)
    .bind(now)
    .bind(now)
    .bind(&pipeline.tags)
    .execute(pool)
    .await?;

    Ok(pipeline)
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Pipeline>, sqlx::Error> {
    let query = format!("SELECT {} FROM pipelines WHERE id = $1", PIPELINE_COLUMNS);
    let row = sqlx::query_as::<_, PipelineRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Into::into))
}

/// Find a pipeline by its unique name
pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Pipeline>, sqlx::Error> {
    let query = format!("SELECT {} FROM pipelines WHERE name = $1", PIPELINE_COLUMNS);
    let row = sqlx::query_as::<_, PipelineRow>(&query)
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Into::into))
}

/// List all pipelines
pub async fn list_all(pool: &PgPool) -> Result<Vec<Pipeline>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM pipelines ORDER BY created_at DESC",
        PIPELINE_COLUMNS
    );
    let rows = sqlx::query_as::<_, PipelineRow>(&query)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// List pipelines placed directly in a folder
pub async fn list_by_folder(pool: &PgPool, folder_id: Uuid) -> Result<Vec<Pipeline>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM pipelines WHERE folder_id = $1 ORDER BY name ASC",
        PIPELINE_COLUMNS
    );
    let rows = sqlx::query_as::<_, PipelineRow>(&query)
        .bind(folder_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Update a pipeline
pub async fn update(pool: &PgPool, id: Uuid, req: CreatePipeline) -> Result<bool, sqlx::Error> {
    let repo = RepositoryColumns::from(req.repository.as_ref());

    let result = sqlx::query(
        r#"
        UPDATE pipelines
        SET name = $1, description = $2, folder_id = $3, repository_kind = $4,
            repository_url = $5, repository_project = $6, repository_token = $7,
            updated_at = $8, tags = $9
        WHERE id = $10
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.folder_id)
    .bind(repo.kind)
    .bind(repo.url)
    .bind(repo.project)
    .bind(repo.token)
    .bind(chrono::Utc::now())
    .bind(&req.tags)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move a pipeline to another folder (or to the root with `None`)
pub async fn move_to_folder(
    pool: &PgPool,
    id: Uuid,
    folder_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE pipelines SET folder_id = $1, updated_at = $2 WHERE id = $3")
        .bind(folder_id)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a pipeline by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

/// Repository reference flattened into nullable columns
struct RepositoryColumns<'a> {
    kind: Option<&'static str>,
    url: Option<&'a str>,
    project: Option<&'a str>,
    token: Option<&'a str>,
}

impl<'a> From<Option<&'a RepositoryRef>> for RepositoryColumns<'a> {
    fn from(repo: Option<&'a RepositoryRef>) -> Self {
        RepositoryColumns {
            kind: repo.map(|r| r.kind.as_str()),
            url: repo.map(|r| r.url.as_str()),
            project: repo.map(|r| r.project.as_str()),
            token: repo.and_then(|r| r.token.as_deref()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    folder_id: Option<Uuid>,
    repository_kind: Option<String>,
    repository_url: Option<String>,
    repository_project: Option<String>,
    repository_token: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    tags: Vec<String>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        let repository = match (
            row.repository_kind.as_deref().and_then(RepositoryKind::parse),
            row.repository_url,
            row.repository_project,
        ) {
            (Some(kind), Some(url), Some(project)) => Some(RepositoryRef {
                kind,
                url,
                project,
                token: row.repository_token,
            }),
            _ => None,
        };

        Pipeline {
            id: row.id,
            name: row.name,
            description: row.description,
            folder_id: row.folder_id,
            repository,
            created_at: row.created_at,
            updated_at: row.updated_at,
            tags: row.tags,
        }
    }
}
