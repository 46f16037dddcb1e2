//! Data storage DTOs

use serde::{Deserialize, Serialize};

use crate::domain::storage::StorageKind;

/// Request to register a storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDataStorage {
    pub name: String,
    pub kind: StorageKind,
    pub cloud_region: String,
    pub path: String,
}

/// Report of a storage's current size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStorageUsage {
    pub size_bytes: i64,
}
