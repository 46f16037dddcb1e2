//! File transfer task domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to copy a file or directory tree from one location to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferTask {
    pub id: Uuid,
    pub source: String,
    pub destination: String,
    pub status: TransferStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub runner_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Created,
    Running,
    Success,
    Failure,
}

impl TransferStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Created => "Created",
            TransferStatus::Running => "Running",
            TransferStatus::Success => "Success",
            TransferStatus::Failure => "Failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(TransferStatus::Created),
            "Running" => Some(TransferStatus::Running),
            "Success" => Some(TransferStatus::Success),
            "Failure" => Some(TransferStatus::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
