//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline definition
///
/// The pipeline sources live in a Git repository; the record only keeps
/// a reference to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Option<Uuid>,
    pub repository: Option<RepositoryRef>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub tags: Vec<String>,
}

/// Location of a pipeline's source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub kind: RepositoryKind,
    /// Base URL of the Git host (e.g. "https://gitlab.example.com")
    pub url: String,
    /// Project path: "namespace/name" for GitLab, "KEY/slug" for Bitbucket
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Supported Git hosting flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryKind {
    Gitlab,
    Bitbucket,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::Gitlab => "Gitlab",
            RepositoryKind::Bitbucket => "Bitbucket",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Gitlab" => Some(RepositoryKind::Gitlab),
            "Bitbucket" => Some(RepositoryKind::Bitbucket),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
