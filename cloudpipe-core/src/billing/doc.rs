//! Billing documents indexed into Elasticsearch

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::storage::StorageKind;

/// Per-day cost of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunBillingDoc {
    pub doc_id: String,
    pub run_id: Uuid,
    pub pipeline_id: Option<Uuid>,
    pub pipeline_name: Option<String>,
    pub owner: String,
    pub instance_type: String,
    pub cloud_region: String,
    pub spot: bool,
    pub date: NaiveDate,
    pub usage_minutes: i64,
    pub compute_cost: i64,
    pub disk_cost: i64,
    pub cost: i64,
}

impl RunBillingDoc {
    pub const KIND: &'static str = "pipeline-run";

    pub fn doc_id_for(run_id: Uuid, date: NaiveDate) -> String {
        format!("{}-{}", run_id, date.format("%Y-%m-%d"))
    }
}

/// Per-day cost of one data storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBillingDoc {
    pub doc_id: String,
    pub storage_id: Uuid,
    pub storage_name: String,
    pub storage_kind: StorageKind,
    pub cloud_region: String,
    pub date: NaiveDate,
    pub usage_bytes: i64,
    pub cost: i64,
}

impl StorageBillingDoc {
    pub const KIND: &'static str = "storage";

    pub fn doc_id_for(storage_id: Uuid, date: NaiveDate) -> String {
        format!("{}-{}", storage_id, date.format("%Y-%m-%d"))
    }
}
