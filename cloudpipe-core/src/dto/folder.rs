//! Folder DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::folder::Folder;
use crate::dto::pipeline::PipelineSummary;

/// Request to create a folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Request to rename a folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameFolder {
    pub name: String,
}

/// A folder with its nested folders and the pipelines it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderTree {
    pub folder: Folder,
    pub children: Vec<FolderTree>,
    pub pipelines: Vec<PipelineSummary>,
}

/// Whole hierarchy: root folders plus pipelines not placed in any folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderHierarchy {
    pub folders: Vec<FolderTree>,
    pub pipelines: Vec<PipelineSummary>,
}
