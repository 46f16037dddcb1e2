//! Cloudpipe Git Clients
//!
//! REST bindings for the Git hosts that store pipeline sources. Both GitLab
//! (API v4) and Bitbucket Server (REST 1.0) are exposed through the
//! [`GitClient`] trait so the API server does not care where a pipeline lives.
//!
//! # Example
//!
//! ```no_run
//! use cloudpipe_git::{GitClient, GitlabClient};
//!
//! # async fn example() -> cloudpipe_git::Result<()> {
//! let client = GitlabClient::new("https://gitlab.example.com", "library/rnaseq", None);
//! for branch in client.list_branches().await? {
//!     println!("{} -> {}", branch.name, branch.commit_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bitbucket;
pub mod error;
pub mod gitlab;
mod http;
pub mod model;

pub use bitbucket::BitbucketClient;
pub use error::{GitError, Result};
pub use gitlab::GitlabClient;
pub use model::{EntryKind, GitCommit, GitRef, GitRepository, GitTreeEntry};

use async_trait::async_trait;
use cloudpipe_core::domain::pipeline::{RepositoryKind, RepositoryRef};

/// Operations every supported Git host provides
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Fetch repository metadata
    async fn get_repository(&self) -> Result<GitRepository>;

    /// Create the repository on the host
    async fn create_repository(&self, description: Option<&str>) -> Result<GitRepository>;

    /// Delete the repository from the host
    async fn delete_repository(&self) -> Result<()>;

    async fn list_branches(&self) -> Result<Vec<GitRef>>;

    async fn list_tags(&self) -> Result<Vec<GitRef>>;

    /// Commits reachable from `git_ref`, newest first, optionally touching `path`
    async fn list_commits(&self, git_ref: &str, path: Option<&str>) -> Result<Vec<GitCommit>>;

    /// Directory listing at `path` (repository root when empty)
    async fn list_tree(&self, git_ref: &str, path: &str, recursive: bool)
    -> Result<Vec<GitTreeEntry>>;

    /// Raw file contents
    async fn get_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a single file on `branch`, returning the new commit id
    async fn commit_file(
        &self,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<String>;
}

/// Build the client matching a pipeline's repository reference
pub fn from_repository(repository: &RepositoryRef) -> Result<Box<dyn GitClient>> {
    if !repository.url.starts_with("http://") && !repository.url.starts_with("https://") {
        return Err(GitError::InvalidRepository(format!(
            "URL must start with http:// or https://: {}",
            repository.url
        )));
    }

    let client: Box<dyn GitClient> = match repository.kind {
        RepositoryKind::Gitlab => Box::new(GitlabClient::new(
            &repository.url,
            &repository.project,
            repository.token.clone(),
        )),
        RepositoryKind::Bitbucket => Box::new(BitbucketClient::new(
            &repository.url,
            &repository.project,
            repository.token.clone(),
        )?),
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(kind: RepositoryKind, url: &str, project: &str) -> RepositoryRef {
        RepositoryRef {
            kind,
            url: url.to_string(),
            project: project.to_string(),
            token: None,
        }
    }

    #[test]
    fn test_factory_rejects_non_http_url() {
        let repo = repository(RepositoryKind::Gitlab, "git@gitlab:group/repo", "group/repo");
        assert!(matches!(
            from_repository(&repo),
            Err(GitError::InvalidRepository(_))
        ));
    }

    #[test]
    fn test_factory_rejects_bitbucket_project_without_slug() {
        let repo = repository(RepositoryKind::Bitbucket, "https://bitbucket.local", "PROJ");
        assert!(from_repository(&repo).is_err());
    }

    #[test]
    fn test_factory_builds_both_kinds() {
        let gitlab = repository(RepositoryKind::Gitlab, "https://gitlab.local", "group/repo");
        let bitbucket = repository(RepositoryKind::Bitbucket, "https://bitbucket.local", "PROJ/repo");
        assert!(from_repository(&gitlab).is_ok());
        assert!(from_repository(&bitbucket).is_ok());
    }
}
