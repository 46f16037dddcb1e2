//! Bitbucket Server REST 1.0 client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::GitClient;
use crate::error::{GitError, Result};
use crate::http::{check_status, parse_json};
use crate::model::{EntryKind, GitCommit, GitRef, GitRepository, GitTreeEntry};

const PAGE_LIMIT: u32 = 100;

/// Client bound to a single Bitbucket Server repository
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    base_url: String,
    project_key: String,
    slug: String,
    token: Option<String>,
    client: Client,
}

impl BitbucketClient {
    /// `project` is "KEY/slug"
    pub fn new(base_url: &str, project: &str, token: Option<String>) -> Result<Self> {
        Self::with_client(base_url, project, token, Client::new())
    }

    pub fn with_client(
        base_url: &str,
        project: &str,
        token: Option<String>,
        client: Client,
    ) -> Result<Self> {
        let (project_key, slug) = project
            .trim_matches('/')
            .split_once('/')
            .filter(|(key, slug)| !key.is_empty() && !slug.is_empty() && !slug.contains('/'))
            .ok_or_else(|| {
                GitError::InvalidRepository(format!(
                    "Bitbucket project must be 'KEY/slug': {}",
                    project
                ))
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_key: project_key.to_string(),
            slug: slug.to_string(),
            token,
            client,
        })
    }

    fn project_url(&self) -> String {
        format!(
            "{}/rest/api/1.0/projects/{}",
            self.base_url, self.project_key
        )
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}", self.project_url(), self.slug)
    }

    /// `{repo_url}/{endpoint}/{path}` with every path segment percent-encoded
    fn path_url(&self, endpoint: &str, path: &str) -> Result<String> {
        let mut url = format!("{}/{}/", self.repo_url(), endpoint);
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Ok(url);
        }

        let mut segments = Vec::new();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(GitError::InvalidPath(path.to_string()));
            }
            segments.push(urlencoding::encode(segment));
        }
        url.push_str(&segments.join("/"));
        Ok(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET every page of a paged endpoint, following `nextPageStart`
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut start: u32 = 0;

        loop {
            let response = self
                .request(Method::GET, url)
                .query(query)
                .query(&[("start", start), ("limit", PAGE_LIMIT)])
                .send()
                .await?;
            let page: Page<T> = parse_json(response).await?;

            items.extend(page.values);

            match page.next_page_start {
                Some(next) if !page.is_last_page && next > start => start = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn list_refs(&self, kind: &str) -> Result<Vec<GitRef>> {
        let url = format!("{}/{}", self.repo_url(), kind);
        let refs: Vec<BitbucketRef> = self.get_all_pages(&url, &[]).await?;
        Ok(refs.into_iter().map(Into::into).collect())
    }

    async fn default_branch(&self) -> Result<Option<String>> {
        let url = format!("{}/default-branch", self.repo_url());
        let response = self.request(Method::GET, &url).send().await?;

        match parse_json::<BitbucketRef>(response).await {
            Ok(branch) => Ok(Some(branch.display_id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Latest commit touching `path` on `branch`, if the file exists there
    async fn latest_commit_for(&self, branch: &str, path: &str) -> Result<Option<String>> {
        let url = format!("{}/commits", self.repo_url());
        let response = self
            .request(Method::GET, &url)
            .query(&[("until", branch), ("path", path)])
            .query(&[("limit", 1u32)])
            .send()
            .await?;

        match parse_json::<Page<BitbucketCommit>>(response).await {
            Ok(page) => Ok(page.values.into_iter().next().map(|c| c.id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl GitClient for BitbucketClient {
    async fn get_repository(&self) -> Result<GitRepository> {
        let response = self.request(Method::GET, &self.repo_url()).send().await?;
        let repo: BitbucketRepository = parse_json(response).await?;
        let default_branch = self.default_branch().await?;

        Ok(repo.into_repository(default_branch))
    }

    async fn create_repository(&self, _description: Option<&str>) -> Result<GitRepository> {
        let url = format!("{}/repos", self.project_url());
        let response = self
            .request(Method::POST, &url)
            .json(&CreateRepositoryRequest {
                name: &self.slug,
                scm_id: "git",
            })
            .send()
            .await?;
        let repo: BitbucketRepository = parse_json(response).await?;

        tracing::info!(
            "Created Bitbucket repository {}/{}",
            self.project_key,
            repo.slug
        );

        Ok(repo.into_repository(None))
    }

    async fn delete_repository(&self) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.repo_url())
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!(
            "Deleted Bitbucket repository {}/{}",
            self.project_key,
            self.slug
        );

        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<GitRef>> {
        self.list_refs("branches").await
    }

    async fn list_tags(&self) -> Result<Vec<GitRef>> {
        self.list_refs("tags").await
    }

    async fn list_commits(&self, git_ref: &str, path: Option<&str>) -> Result<Vec<GitCommit>> {
        let url = format!("{}/commits", self.repo_url());
        let mut query = vec![("until", git_ref.to_string())];
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }

        let commits: Vec<BitbucketCommit> = self.get_all_pages(&url, &query).await?;
        Ok(commits.into_iter().map(Into::into).collect())
    }

    async fn list_tree(
        &self,
        git_ref: &str,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<GitTreeEntry>> {
        let path = path.trim_matches('/');
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        if recursive {
            // Only files are listed, relative to `path`
            let url = self.path_url("files", path)?;
            let files: Vec<String> = self
                .get_all_pages(&url, &[("at", git_ref.to_string())])
                .await?;

            return Ok(files
                .into_iter()
                .map(|file| GitTreeEntry::from_path(format!("{}{}", prefix, file), EntryKind::File))
                .collect());
        }

        let url = self.path_url("browse", path)?;
        let mut entries = Vec::new();
        let mut start: u32 = 0;

        loop {
            let response = self
                .request(Method::GET, &url)
                .query(&[("at", git_ref)])
                .query(&[("start", start), ("limit", PAGE_LIMIT)])
                .send()
                .await?;
            let listing: BrowseResponse = parse_json(response).await?;
            let children = listing.children.ok_or_else(|| {
                GitError::ParseError(format!("{} is not a directory", path))
            })?;

            entries.extend(children.values.into_iter().map(|child| {
                let kind = if child.entry_type == "DIRECTORY" {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                GitTreeEntry::from_path(format!("{}{}", prefix, child.path.to_string), kind)
            }));

            match children.next_page_start {
                Some(next) if !children.is_last_page && next > start => start = next,
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn get_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.path_url("raw", path)?;
        let response = self
            .request(Method::GET, &url)
            .query(&[("at", git_ref)])
            .send()
            .await?;

        let bytes = check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn commit_file(
        &self,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<String> {
        let path = path.trim_start_matches('/');
        let url = self.path_url("browse", path)?;
        let source_commit = self.latest_commit_for(branch, path).await?;

        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let mut form = Form::new()
            .part("content", Part::bytes(content.to_vec()).file_name(file_name))
            .text("message", message.to_string())
            .text("branch", branch.to_string());
        if let Some(commit) = &source_commit {
            form = form.text("sourceCommitId", commit.clone());
        }

        let response = self
            .request(Method::PUT, &url)
            .multipart(form)
            .send()
            .await?;
        let commit: BitbucketCommit = parse_json(response).await?;

        tracing::info!(
            "Committed {} to {}/{}@{}: {}",
            path,
            self.project_key,
            self.slug,
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
#[serde(rename_all = "camelCase")]
struct Page<T> {
    values: Vec<T>,
    #[serde(default = "default_true")]
    is_last_page: bool,
    next_page_start: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BitbucketRepository {
    slug: String,
    name: String,
    project: BitbucketProject,
    #[serde(default)]
    links: BitbucketLinks,
}

impl BitbucketRepository {
    fn into_repository(self, default_branch: Option<String>) -> GitRepository {
        let clone_url = self
            .links
            .clone
            .into_iter()
            .find(|link| link.name == "http")
            .map(|link| link.href);

        GitRepository {
            name: self.name,
            full_path: format!("{}/{}", self.project.key, self.slug),
            default_branch,
            clone_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BitbucketProject {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<BitbucketLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketLink {
    href: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketRef {
    display_id: String,
    #[serde(default)]
    latest_commit: String,
}

impl From<BitbucketRef> for GitRef {
    fn from(r: BitbucketRef) -> Self {
        GitRef {
            name: r.display_id,
            commit_id: r.latest_commit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketCommit {
    id: String,
    #[serde(default)]
    message: String,
    author: Option<BitbucketAuthor>,
    author_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BitbucketAuthor {
    name: String,
}

impl From<BitbucketCommit> for GitCommit {
    fn from(c: BitbucketCommit) -> Self {
        GitCommit {
            id: c.id,
            message: c.message,
            author: c.author.map(|a| a.name),
            authored_at: c
                .author_timestamp
                .and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrowseResponse {
    children: Option<BrowseChildren>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseChildren {
    values: Vec<BrowseEntry>,
    #[serde(default = "default_true")]
    is_last_page: bool,
    next_page_start: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BrowseEntry {
    path: BrowsePath,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct BrowsePath {
    #[serde(rename = "toString")]
    to_string: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRepositoryRequest<'a> {
    name: &'a str,
    scm_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPO_PATH: &str = "/rest/api/1.0/projects/LIB/repos/rnaseq";

    fn client(server: &MockServer) -> BitbucketClient {
        BitbucketClient::new(&server.uri(), "LIB/rnaseq", Some("token".to_string())).unwrap()
    }

    #[test]
    fn test_project_must_have_key_and_slug() {
        assert!(BitbucketClient::new("https://bb.local", "LIB", None).is_err());
        assert!(BitbucketClient::new("https://bb.local", "LIB/a/b", None).is_err());
        assert!(BitbucketClient::new("https://bb.local", "/LIB/rnaseq/", None).is_ok());
    }

    #[tokio::test]
    async fn test_get_repository_with_default_branch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(REPO_PATH))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "slug": "rnaseq",
                "name": "RNA-seq",
                "project": { "key": "LIB" },
                "links": { "clone": [
                    { "href": "ssh://git@bb.local/lib/rnaseq.git", "name": "ssh" },
                    { "href": "https://bb.local/scm/lib/rnaseq.git", "name": "http" }
                ]}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("{}/default-branch", REPO_PATH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "refs/heads/master",
                "displayId": "master"
            })))
            .mount(&server)
            .await;

        let repo = client(&server).get_repository().await.unwrap();
        assert_eq!(repo.full_path, "LIB/rnaseq");
        assert_eq!(repo.default_branch.as_deref(), Some("master"));
        assert_eq!(
            repo.clone_url.as_deref(),
            Some("https://bb.local/scm/lib/rnaseq.git")
        );
    }

    #[tokio::test]
    async fn test_tags_follow_next_page_start() {
        let server = MockServer::start().await;
        let url = format!("{}/tags", REPO_PATH);

        Mock::given(method("GET"))
            .and(path(url.as_str()))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [{ "id": "refs/tags/v1", "displayId": "v1", "latestCommit": "111" }],
                "isLastPage": false,
                "nextPageStart": 1
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(url.as_str()))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [{ "id": "refs/tags/v2", "displayId": "v2", "latestCommit": "222" }],
                "isLastPage": true
            })))
            .mount(&server)
            .await;

        let tags = client(&server).list_tags().await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["v1", "v2"]);
        assert_eq!(tags[1].commit_id, "222");
    }

    #[tokio::test]
    async fn test_recursive_tree_prefixes_paths() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/files/src", REPO_PATH).as_str()))
            .and(query_param("at", "master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": ["main.nf", "modules/align.nf"],
                "isLastPage": true
            })))
            .mount(&server)
            .await;

        let entries = client(&server).list_tree("master", "src", true).await.unwrap();
        assert_eq!(entries[1].path, "src/modules/align.nf");
        assert_eq!(entries[1].name, "align.nf");
        assert!(entries.iter().all(|e| e.kind == EntryKind::File));
    }

    #[tokio::test]
    async fn test_browse_lists_directories() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/browse/", REPO_PATH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "path": { "toString": "" },
                "children": {
                    "values": [
                        { "path": { "toString": "docs", "name": "docs" }, "type": "DIRECTORY" },
                        { "path": { "toString": "main.nf", "name": "main.nf" }, "type": "FILE" }
                    ],
                    "isLastPage": true
                }
            })))
            .mount(&server)
            .await;

        let entries = client(&server).list_tree("master", "", false).await.unwrap();
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[1].path, "main.nf");
    }

    #[tokio::test]
    async fn test_dot_segments_never_reach_the_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let result = client
            .list_tree("master", "../../../../admin/users", false)
            .await;
        assert!(matches!(result, Err(GitError::InvalidPath(_))));

        let result = client.list_tree("master", "src/./../..", true).await;
        assert!(matches!(result, Err(GitError::InvalidPath(_))));

        let result = client.get_file("master", "conf/../../secrets").await;
        assert!(matches!(result, Err(GitError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/raw/docs/read%20me.md", REPO_PATH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let content = client(&server)
            .get_file("master", "docs/read me.md")
            .await
            .unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn test_get_raw_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/raw/src/main.nf", REPO_PATH).as_str()))
            .and(query_param("at", "v2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("workflow {}"))
            .mount(&server)
            .await;

        let content = client(&server).get_file("v2", "src/main.nf").await.unwrap();
        assert_eq!(content, b"workflow {}");
    }

    #[tokio::test]
    async fn test_commit_new_file_without_source_commit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("{}/commits", REPO_PATH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [],
                "isLastPage": true
            })))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path(format!("{}/browse/README.md", REPO_PATH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "abc123",
                "message": "Add readme",
                "authorTimestamp": 1709287200000i64
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .commit_file("master", "README.md", b"# rnaseq", "Add readme")
            .await
            .unwrap();
        assert_eq!(id, "abc123");
    }
}
