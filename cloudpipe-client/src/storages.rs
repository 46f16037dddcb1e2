//! Data storage API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::storage::DataStorage;
use cloudpipe_core::dto::storage::{CreateDataStorage, UpdateStorageUsage};
use uuid::Uuid;

impl ApiClient {
    pub async fn create_storage(&self, req: CreateDataStorage) -> Result<DataStorage> {
        let url = format!("{}/storage", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn list_storages(&self) -> Result<Vec<DataStorage>> {
        let url = format!("{}/storage", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_storage(&self, storage_id: Uuid) -> Result<DataStorage> {
        let url = format!("{}/storage/{}", self.base_url, storage_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Report the current size of a storage
    pub async fn update_storage_usage(&self, storage_id: Uuid, size_bytes: i64) -> Result<DataStorage> {
        let url = format!("{}/storage/{}/usage", self.base_url, storage_id);
        let response = self
            .client
            .put(&url)
            .json(&UpdateStorageUsage { size_bytes })
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn delete_storage(&self, storage_id: Uuid) -> Result<()> {
        let url = format!("{}/storage/{}", self.base_url, storage_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
