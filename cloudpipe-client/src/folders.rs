//! Folder-related API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::folder::Folder;
use cloudpipe_core::dto::folder::{CreateFolder, FolderHierarchy, RenameFolder};
use uuid::Uuid;

impl ApiClient {
    // =============================================================================
    // Folder Management
    // =============================================================================

    /// Create a folder, at the root when `parent_id` is `None`
    pub async fn create_folder(&self, req: CreateFolder) -> Result<Folder> {
        let url = format!("{}/folder", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// The whole folder tree with the pipelines in each folder
    pub async fn folder_tree(&self) -> Result<FolderHierarchy> {
        let url = format!("{}/folder", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_folder(&self, folder_id: Uuid) -> Result<Folder> {
        let url = format!("{}/folder/{}", self.base_url, folder_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn rename_folder(&self, folder_id: Uuid, name: impl Into<String>) -> Result<Folder> {
        let url = format!("{}/folder/{}", self.base_url, folder_id);
        let req = RenameFolder { name: name.into() };
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Delete an empty folder
    pub async fn delete_folder(&self, folder_id: Uuid) -> Result<()> {
        let url = format!("{}/folder/{}", self.base_url, folder_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
