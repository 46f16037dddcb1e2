//! Folder domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A folder groups pipelines and other folders into a tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
