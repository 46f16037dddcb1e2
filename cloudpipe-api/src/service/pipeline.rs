//! Pipeline Service
//!
//! Business logic for pipeline management. Pipeline sources are read from
//! and written to the pipeline's Git repository.

use cloudpipe_core::domain::pipeline::{Pipeline, RepositoryRef};
use cloudpipe_core::dto::pipeline::{
    CommitSourceFile, CreatePipeline, PipelineVersion, SourceEntry, VersionKind,
};
use cloudpipe_git::{EntryKind, GitClient, GitError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{folder_repository, pipeline_repository};

/// Service error type
#[derive(Debug)]
pub enum PipelineError {
    NotFound(Uuid),
    FolderNotFound(Uuid),
    AlreadyExists(String),
    ValidationError(String),
    GitError(GitError),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::DatabaseError(err)
    }
}

impl From<GitError> for PipelineError {
    fn from(err: GitError) -> Self {
        PipelineError::GitError(err)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Create a new pipeline, optionally creating its repository first
pub async fn create_pipeline(pool: &PgPool, req: CreatePipeline) -> Result<Pipeline> {
    validate_pipeline_request(&req)?;

    if pipeline_repository::find_by_name(pool, &req.name)
        .await?
        .is_some()
    {
        return Err(PipelineError::AlreadyExists(req.name));
    }

    ensure_folder_exists(pool, req.folder_id).await?;

    if req.create_repository {
        let repository = req.repository.as_ref().ok_or_else(|| {
            PipelineError::ValidationError(
                "A repository is required to create one".to_string(),
            )
        })?;
        let client = cloudpipe_git::from_repository(repository)?;
        let created = client
            .create_repository(req.description.as_deref())
            .await?;
        tracing::info!("Repository created: {}", created.full_path);
    }

    let pipeline = pipeline_repository::create(pool, req).await?;

    tracing::info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);

    Ok(pipeline)
}

/// Get a pipeline by ID
pub async fn get_pipeline(pool: &PgPool, id: Uuid) -> Result<Pipeline> {
    let pipeline = pipeline_repository::find_by_id(pool, id)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    Ok(pipeline)
}

/// List all pipelines
pub async fn list_pipelines(pool: &PgPool) -> Result<Vec<Pipeline>> {
    let pipelines = pipeline_repository::list_all(pool).await?;
    Ok(pipelines)
}

/// Update a pipeline
pub async fn update_pipeline(pool: &PgPool, id: Uuid, req: CreatePipeline) -> Result<Pipeline> {
    validate_pipeline_request(&req)?;

    let _existing = pipeline_repository::find_by_id(pool, id)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    if let Some(other) = pipeline_repository::find_by_name(pool, &req.name).await? {
        if other.id != id {
            return Err(PipelineError::AlreadyExists(req.name));
        }
    }

    ensure_folder_exists(pool, req.folder_id).await?;

    let updated = pipeline_repository::update(pool, id, req).await?;
    if !updated {
        return Err(PipelineError::NotFound(id));
    }

    get_pipeline(pool, id).await
}

/// Move a pipeline into a folder, or to the root
pub async fn move_pipeline(pool: &PgPool, id: Uuid, folder_id: Option<Uuid>) -> Result<Pipeline> {
    ensure_folder_exists(pool, folder_id).await?;

    let moved = pipeline_repository::move_to_folder(pool, id, folder_id).await?;
    if !moved {
        return Err(PipelineError::NotFound(id));
    }

    get_pipeline(pool, id).await
}

/// Delete a pipeline, optionally removing its repository from the Git host
pub async fn delete_pipeline(pool: &PgPool, id: Uuid, delete_repository: bool) -> Result<()> {
    let pipeline = get_pipeline(pool, id).await?;

    if delete_repository {
        let client = git_client(&pipeline)?;
        client.delete_repository().await?;
        tracing::info!("Repository of pipeline {} deleted", id);
    }

    let deleted = pipeline_repository::delete(pool, id).await?;
    if !deleted {
        return Err(PipelineError::NotFound(id));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(())
}

/// Branches and tags of the pipeline repository
pub async fn list_versions(pool: &PgPool, id: Uuid) -> Result<Vec<PipelineVersion>> {
    let pipeline = get_pipeline(pool, id).await?;
    let client = git_client(&pipeline)?;

    let branches = client.list_branches().await?;
    let tags = client.list_tags().await?;

    let versions = branches
        .into_iter()
        .map(|r| PipelineVersion {
            name: r.name,
            kind: VersionKind::Branch,
            commit: r.commit_id,
        })
        .chain(tags.into_iter().map(|r| PipelineVersion {
            name: r.name,
            kind: VersionKind::Tag,
            commit: r.commit_id,
        }))
        .collect();

    Ok(versions)
}

/// One level of the source tree at `path` (root when absent)
pub async fn list_source(
    pool: &PgPool,
    id: Uuid,
    version: Option<String>,
    path: Option<String>,
) -> Result<Vec<SourceEntry>> {
    let path = normalize_source_path(path.as_deref().unwrap_or_default())?;

    let pipeline = get_pipeline(pool, id).await?;
    let client = git_client(&pipeline)?;
    let version = resolve_version(client.as_ref(), version).await?;

    let entries = client.list_tree(&version, path, false).await?;

    Ok(entries
        .into_iter()
        .map(|entry| SourceEntry {
            is_directory: entry.kind == EntryKind::Directory,
            name: entry.name,
            path: entry.path,
        })
        .collect())
}

/// Raw contents of one source file
pub async fn get_source_file(
    pool: &PgPool,
    id: Uuid,
    version: Option<String>,
    path: &str,
) -> Result<Vec<u8>> {
    let path = validate_source_path(path)?;

    let pipeline = get_pipeline(pool, id).await?;
    let client = git_client(&pipeline)?;
    let version = resolve_version(client.as_ref(), version).await?;

    Ok(client.get_file(&version, path).await?)
}

/// Write one source file, returning the id of the new commit
pub async fn commit_source_file(pool: &PgPool, id: Uuid, req: CommitSourceFile) -> Result<String> {
    let path = validate_source_path(&req.path)?;
    if req.message.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Commit message cannot be empty".to_string(),
        ));
    }

    let pipeline = get_pipeline(pool, id).await?;
    let client = git_client(&pipeline)?;
    let branch = resolve_version(client.as_ref(), req.branch).await?;

    let commit = client
        .commit_file(&branch, path, req.content.as_bytes(), &req.message)
        .await?;

    tracing::info!(
        "Committed {} to pipeline {} on {}: {}",
        path,
        id,
        branch,
        commit
    );

    Ok(commit)
}

// =============================================================================
// Helper Functions
// =============================================================================

async fn ensure_folder_exists(pool: &PgPool, folder_id: Option<Uuid>) -> Result<()> {
    if let Some(folder_id) = folder_id {
        folder_repository::find_by_id(pool, folder_id)
            .await?
            .ok_or(PipelineError::FolderNotFound(folder_id))?;
    }
    Ok(())
}

fn repository_of(pipeline: &Pipeline) -> Result<&RepositoryRef> {
    pipeline.repository.as_ref().ok_or_else(|| {
        PipelineError::ValidationError(format!(
            "Pipeline {} has no source repository",
            pipeline.id
        ))
    })
}

fn git_client(pipeline: &Pipeline) -> Result<Box<dyn GitClient>> {
    let repository = repository_of(pipeline)?;
    Ok(cloudpipe_git::from_repository(repository)?)
}

/// Requested version, or the repository default branch
async fn resolve_version(client: &dyn GitClient, version: Option<String>) -> Result<String> {
    if let Some(version) = version.filter(|v| !v.trim().is_empty()) {
        return Ok(version);
    }

    client
        .get_repository()
        .await?
        .default_branch
        .ok_or_else(|| {
            PipelineError::ValidationError(
                "Repository has no default branch, a version is required".to_string(),
            )
        })
}

// =============================================================================
// Validation
// =============================================================================

fn validate_pipeline_request(req: &CreatePipeline) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 255 {
        return Err(PipelineError::ValidationError(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    if let Some(repository) = &req.repository {
        if !repository.url.starts_with("http://") && !repository.url.starts_with("https://") {
            return Err(PipelineError::ValidationError(format!(
                "Repository URL must start with http:// or https://: {}",
                repository.url
            )));
        }

        if repository.project.trim().is_empty() {
            return Err(PipelineError::ValidationError(
                "Repository project cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_source_path(path: &str) -> Result<&str> {
    let path = normalize_source_path(path)?;
    if path.is_empty() {
        return Err(PipelineError::ValidationError(
            "File path cannot be empty".to_string(),
        ));
    }
    Ok(path)
}

/// Repository-relative path; empty means the root
fn normalize_source_path(path: &str) -> Result<&str> {
    let path = path.trim_matches('/');
    if path.split('/').any(|segment| segment == "..") {
        return Err(PipelineError::ValidationError(format!(
            "Path cannot leave the repository: {}",
            path
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpipe_core::domain::pipeline::RepositoryKind;

    fn request(name: &str, repository: Option<RepositoryRef>) -> CreatePipeline {
        CreatePipeline {
            name: name.to_string(),
            description: None,
            folder_id: None,
            repository,
            tags: vec![],
            create_repository: false,
        }
    }

    fn gitlab(url: &str) -> RepositoryRef {
        RepositoryRef {
            kind: RepositoryKind::Gitlab,
            url: url.to_string(),
            project: "library/rnaseq".to_string(),
            token: None,
        }
    }

    #[test]
    fn test_validate_empty_name() {
        let result = validate_pipeline_request(&request("", None));
        assert!(matches!(result, Err(PipelineError::ValidationError(_))));
    }

    #[test]
    fn test_validate_repository_url_scheme() {
        let result = validate_pipeline_request(&request("rnaseq", Some(gitlab("ftp://git.local"))));
        assert!(matches!(result, Err(PipelineError::ValidationError(_))));

        let result =
            validate_pipeline_request(&request("rnaseq", Some(gitlab("https://gitlab.local"))));
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_request_without_repository() {
        assert!(validate_pipeline_request(&request("scratch", None)).is_ok());
    }

    #[test]
    fn test_validate_source_path() {
        assert_eq!(validate_source_path("/main.nf").ok(), Some("main.nf"));
        assert!(validate_source_path("/").is_err());
        assert!(validate_source_path("conf/../../etc/passwd").is_err());
    }

    #[test]
    fn test_listing_path_allows_root_but_not_parent_segments() {
        assert_eq!(normalize_source_path("").ok(), Some(""));
        assert_eq!(normalize_source_path("/modules/").ok(), Some("modules"));
        assert!(matches!(
            normalize_source_path("../../../../admin/users"),
            Err(PipelineError::ValidationError(_))
        ));
        assert!(normalize_source_path("modules/..").is_err());
    }

    #[test]
    fn test_pipeline_without_repository_has_no_client() {
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: "scratch".to_string(),
            description: None,
            folder_id: None,
            repository: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            tags: vec![],
        };

        assert!(matches!(
            git_client(&pipeline),
            Err(PipelineError::ValidationError(_))
        ));
    }
}
