//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pipeline::{Pipeline, RepositoryRef};

/// Request to create or update a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Option<Uuid>,
    pub repository: Option<RepositoryRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Create the repository on the Git host before registering the pipeline
    #[serde(default)]
    pub create_repository: bool,
}

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub folder_id: Option<Uuid>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub tags: Vec<String>,
}

impl From<Pipeline> for PipelineSummary {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            id: pipeline.id,
            name: pipeline.name,
            description: pipeline.description,
            folder_id: pipeline.folder_id,
            updated_at: pipeline.updated_at,
            tags: pipeline.tags,
        }
    }
}

/// A branch or tag of the pipeline's repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub name: String,
    pub kind: VersionKind,
    pub commit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionKind {
    Branch,
    Tag,
}

/// One entry of a repository directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
}

/// Request to write one source file of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSourceFile {
    /// Target branch; the repository default branch when absent
    pub branch: Option<String>,
    pub path: String,
    pub content: String,
    pub message: String,
}

/// Commit created by a source file update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResult {
    pub commit: String,
}

/// Request to move a pipeline into another folder (root when absent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePipeline {
    pub folder_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_summary_conversion() {
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            name: "rnaseq".to_string(),
            description: Some("RNA-seq quantification".to_string()),
            folder_id: None,
            repository: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            tags: vec!["ngs".to_string()],
        };

        let summary: PipelineSummary = pipeline.clone().into();
        assert_eq!(summary.id, pipeline.id);
        assert_eq!(summary.name, pipeline.name);
        assert_eq!(summary.tags, pipeline.tags);
    }
}
