//! Transfer task API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::{ClaimTransfer, CreateTransferTask, FinishTransfer};
use uuid::Uuid;

impl ApiClient {
    // =============================================================================
    // Transfer Management
    // =============================================================================

    pub async fn create_transfer(&self, req: CreateTransferTask) -> Result<TransferTask> {
        let url = format!("{}/transfer", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List transfers, optionally only those in one status
    pub async fn list_transfers(&self, status: Option<TransferStatus>) -> Result<Vec<TransferTask>> {
        let url = format!("{}/transfer", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    pub async fn get_transfer(&self, transfer_id: Uuid) -> Result<TransferTask> {
        let url = format!("{}/transfer/{}", self.base_url, transfer_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn delete_transfer(&self, transfer_id: Uuid) -> Result<()> {
        let url = format!("{}/transfer/{}", self.base_url, transfer_id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Runner Protocol
    // =============================================================================

    /// Claim a created transfer; a lost race answers 409 (`is_conflict()`)
    pub async fn claim_transfer(
        &self,
        transfer_id: Uuid,
        runner_id: impl Into<String>,
    ) -> Result<TransferTask> {
        let url = format!("{}/transfer/{}/claim", self.base_url, transfer_id);
        let req = ClaimTransfer {
            runner_id: runner_id.into(),
        };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Report the final status of a transfer
    pub async fn finish_transfer(&self, transfer_id: Uuid, req: FinishTransfer) -> Result<TransferTask> {
        let url = format!("{}/transfer/{}/finish", self.base_url, transfer_id);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
