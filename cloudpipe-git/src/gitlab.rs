//! GitLab API v4 client

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::GitClient;
use crate::error::{GitError, Result};
use crate::http::{check_status, parse_json};
use crate::model::{EntryKind, GitCommit, GitRef, GitRepository, GitTreeEntry};

const PER_PAGE: u32 = 100;
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "X-Next-Page";

/// Client bound to a single GitLab project
#[derive(Debug, Clone)]
pub struct GitlabClient {
    base_url: String,
    /// "namespace/name"
    project: String,
    token: Option<String>,
    client: Client,
}

impl GitlabClient {
    pub fn new(base_url: &str, project: &str, token: Option<String>) -> Self {
        Self::with_client(base_url, project, token, Client::new())
    }

    pub fn with_client(base_url: &str, project: &str, token: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.trim_matches('/').to_string(),
            token,
            client,
        }
    }

    fn api_url(&self) -> String {
        format!("{}/api/v4", self.base_url)
    }

    fn project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.api_url(),
            urlencoding::encode(&self.project)
        )
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/repository/files/{}",
            self.project_url(),
            urlencoding::encode(path.trim_start_matches('/'))
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// GET every page of a list endpoint, following `X-Next-Page`
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .request(Method::GET, url)
                .query(query)
                .query(&[("page", page), ("per_page", PER_PAGE)])
                .send()
                .await?;

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u32>().ok());

            let batch: Vec<T> = parse_json(response).await?;
            tracing::debug!("Fetched {} item(s) from {} page {}", batch.len(), url, page);
            items.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn file_exists(&self, branch: &str, path: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &self.file_url(path))
            .query(&[("ref", branch)])
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn split_project(&self) -> Result<(&str, &str)> {
        self.project
            .rsplit_once('/')
            .ok_or_else(|| {
                GitError::InvalidRepository(format!(
                    "GitLab project must be 'namespace/name': {}",
                    self.project
                ))
            })
    }
}

#[async_trait]
impl GitClient for GitlabClient {
    async fn get_repository(&self) -> Result<GitRepository> {
        let response = self.request(Method::GET, &self.project_url()).send().await?;
        let project: GitlabProject = parse_json(response).await?;
        Ok(project.into())
    }

    async fn create_repository(&self, description: Option<&str>) -> Result<GitRepository> {
        let (namespace, name) = self.split_project()?;

        let namespace_url = format!(
            "{}/namespaces/{}",
            self.api_url(),
            urlencoding::encode(namespace)
        );
        let response = self.request(Method::GET, &namespace_url).send().await?;
        let namespace: GitlabNamespace = parse_json(response).await?;

        let request = CreateProjectRequest {
            name,
            path: name,
            namespace_id: namespace.id,
            description,
            visibility: "private",
        };

        let url = format!("{}/projects", self.api_url());
        let response = self
            .request(Method::POST, &url)
            .json(&request)
            .send()
            .await?;
        let project: GitlabProject = parse_json(response).await?;

        tracing::info!("Created GitLab project {}", project.path_with_namespace);

        Ok(project.into())
    }

    async fn delete_repository(&self) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.project_url())
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!("Deleted GitLab project {}", self.project);

        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<GitRef>> {
        let url = format!("{}/repository/branches", self.project_url());
        let branches: Vec<GitlabRef> = self.get_all_pages(&url, &[]).await?;
        Ok(branches.into_iter().map(Into::into).collect())
    }

    async fn list_tags(&self) -> Result<Vec<GitRef>> {
        let url = format!("{}/repository/tags", self.project_url());
        let tags: Vec<GitlabRef> = self.get_all_pages(&url, &[]).await?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    async fn list_commits(&self, git_ref: &str, path: Option<&str>) -> Result<Vec<GitCommit>> {
        let url = format!("{}/repository/commits", self.project_url());
        let mut query = vec![("ref_name", git_ref.to_string())];
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }

        let commits: Vec<GitlabCommit> = self.get_all_pages(&url, &query).await?;
        Ok(commits.into_iter().map(Into::into).collect())
    }

    async fn list_tree(
        &self,
        git_ref: &str,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<GitTreeEntry>> {
        let url = format!("{}/repository/tree", self.project_url());
        let mut query = vec![
            ("ref", git_ref.to_string()),
            ("recursive", recursive.to_string()),
        ];
        let path = path.trim_matches('/');
        if !path.is_empty() {
            query.push(("path", path.to_string()));
        }

        let entries: Vec<GitlabTreeEntry> = self.get_all_pages(&url, &query).await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn get_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, &self.file_url(path))
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        let file: GitlabFile = parse_json(response).await?;

        match file.encoding.as_deref() {
            Some("base64") => {
                let cleaned: String = file.content.split_whitespace().collect();
                BASE64.decode(cleaned).map_err(|e| {
                    GitError::ParseError(format!("Invalid base64 content of {}: {}", path, e))
                })
            }
            _ => Ok(file.content.into_bytes()),
        }
    }

    async fn commit_file(
        &self,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<String> {
        let file_path = path.trim_start_matches('/');
        let action = if self.file_exists(branch, file_path).await? {
            "update"
        } else {
            "create"
        };

        let request = CreateCommitRequest {
            branch,
            commit_message: message,
            actions: vec![CommitAction {
                action,
                file_path,
                content: BASE64.encode(content),
                encoding: "base64",
            }],
        };

        let url = format!("{}/repository/commits", self.project_url());
        let response = self
            .request(Method::POST, &url)
            .json(&request)
            .send()
            .await?;
        let commit: GitlabCommit = parse_json(response).await?;

        tracing::info!(
            "Committed {} ({}) to {}@{}: {}",
            file_path,
            action,
            self.project,
            branch,
            commit.id
        );

        Ok(commit.id)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GitlabProject {
    name: String,
    path_with_namespace: String,
    default_branch: Option<String>,
    http_url_to_repo: Option<String>,
}

impl From<GitlabProject> for GitRepository {
    fn from(project: GitlabProject) -> Self {
        GitRepository {
            name: project.name,
            full_path: project.path_with_namespace,
            default_branch: project.default_branch,
            clone_url: project.http_url_to_repo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitlabNamespace {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct GitlabRef {
    name: String,
    commit: GitlabCommit,
}

impl From<GitlabRef> for GitRef {
    fn from(r: GitlabRef) -> Self {
        GitRef {
            name: r.name,
            commit_id: r.commit.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitlabCommit {
    id: String,
    #[serde(default)]
    message: String,
    author_name: Option<String>,
    authored_date: Option<DateTime<Utc>>,
}

impl From<GitlabCommit> for GitCommit {
    fn from(c: GitlabCommit) -> Self {
        GitCommit {
            id: c.id,
            message: c.message,
            author: c.author_name,
            authored_at: c.authored_date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitlabTreeEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

impl From<GitlabTreeEntry> for GitTreeEntry {
    fn from(e: GitlabTreeEntry) -> Self {
        GitTreeEntry {
            name: e.name,
            path: e.path,
            kind: if e.entry_type == "tree" {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitlabFile {
    content: String,
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'a> {
    name: &'a str,
    path: &'a str,
    namespace_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    visibility: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateCommitRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
    actions: Vec<CommitAction<'a>>,
}

#[derive(Debug, Serialize)]
struct CommitAction<'a> {
    action: &'a str,
    file_path: &'a str,
    content: String,
    encoding: &'a str,
}
