//! Repository Module
//!
//! Data access layer for the API server.
//! Each repository holds the SQL statements for one entity type.

pub mod folder;
pub mod offer;
pub mod pipeline;
pub mod run;
pub mod run_status;
pub mod schedule;
pub mod storage;
pub mod transfer;

// Re-export for convenience
pub use folder as folder_repository;
pub use offer as offer_repository;
pub use pipeline as pipeline_repository;
pub use run as run_repository;
pub use run_status as run_status_repository;
pub use schedule as schedule_repository;
pub use storage as storage_repository;
pub use transfer as transfer_repository;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};
    use cloudpipe_core::domain::offer::InstanceOffer;
    use cloudpipe_core::domain::run::{PipelineRun, RunInstance, RunPrices, TaskStatus};
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use std::collections::HashMap;
    use uuid::Uuid;

    pub const REGION: &str = "us-east-1";
    pub const NODE_TYPE: &str = "m5.large";

    /// Fresh schema for a `#[sqlx::test]` database
    pub async fn migrated(pool: &PgPool) {
        crate::db::run_migrations(pool).await.unwrap();
    }

    /// Offer for `NODE_TYPE` so runs can be launched
    pub async fn seed_offer(pool: &PgPool) {
        let offer = InstanceOffer {
            instance_type: NODE_TYPE.to_string(),
            cloud_region: REGION.to_string(),
            price_per_hour: Decimal::new(96, 3),
            vcpu: 2,
            memory_gib: 8.0,
            gpu: 0,
        };
        super::offer::replace_region(pool, REGION, &[offer])
            .await
            .unwrap();
    }

    pub fn run(
        pipeline_id: Option<Uuid>,
        status: TaskStatus,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> PipelineRun {
        PipelineRun {
            id: Uuid::new_v4(),
            pipeline_id,
            version: None,
            owner: "alice".to_string(),
            status,
            start_date,
            end_date,
            instance: RunInstance {
                node_type: NODE_TYPE.to_string(),
                cloud_region: REGION.to_string(),
                disk_size_gb: 50,
                spot: false,
            },
            prices: RunPrices::default(),
            parameters: HashMap::new(),
            parent_run_id: None,
            status_history: Vec::new(),
        }
    }
}
