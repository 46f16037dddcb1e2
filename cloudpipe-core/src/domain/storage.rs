//! Data storage domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bucket or file share registered with the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStorage {
    pub id: Uuid,
    pub name: String,
    pub kind: StorageKind,
    pub cloud_region: String,
    pub path: String,
    pub size_bytes: i64,
    pub usage_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    ObjectStorage,
    FileStorage,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::ObjectStorage => "ObjectStorage",
            StorageKind::FileStorage => "FileStorage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ObjectStorage" => Some(StorageKind::ObjectStorage),
            "FileStorage" => Some(StorageKind::FileStorage),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
