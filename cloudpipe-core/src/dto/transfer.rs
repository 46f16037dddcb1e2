//! File transfer DTOs

use serde::{Deserialize, Serialize};

use crate::domain::transfer::TransferStatus;

/// Request to create a transfer task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferTask {
    pub source: String,
    pub destination: String,
}

/// A runner claiming a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimTransfer {
    pub runner_id: String,
}

/// Final outcome reported by the runner holding the claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishTransfer {
    pub runner_id: String,
    pub status: TransferStatus,
    pub reason: Option<String>,
}

impl FinishTransfer {
    pub fn success(runner_id: impl Into<String>) -> Self {
        Self {
            runner_id: runner_id.into(),
            status: TransferStatus::Success,
            reason: None,
        }
    }

    pub fn failure(runner_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            runner_id: runner_id.into(),
            status: TransferStatus::Failure,
            reason: Some(reason.into()),
        }
    }
}
