use chrono::NaiveDate;
use cloudpipe_core::billing::{PriceTier, StorageBillingDoc, daily_storage_cost};
use cloudpipe_core::domain::storage::DataStorage;

use crate::error::BillingError;
use crate::pricing::PriceTable;

/// Bills data storages for one day at their current size
pub struct StorageBillingConverter;

impl StorageBillingConverter {
    pub fn convert(storage: &DataStorage, tiers: &[PriceTier], day: NaiveDate) -> StorageBillingDoc {
        StorageBillingDoc {
            doc_id: StorageBillingDoc::doc_id_for(storage.id, day),
            storage_id: storage.id,
            storage_name: storage.name.clone(),
            storage_kind: storage.kind,
            cloud_region: storage.cloud_region.clone(),
            date: day,
            usage_bytes: storage.size_bytes,
            cost: daily_storage_cost(storage.size_bytes, tiers, day),
        }
    }

    /// Storages in regions without a known price are logged and skipped
    pub fn convert_all(
        storages: &[DataStorage],
        prices: &PriceTable,
        day: NaiveDate,
    ) -> Vec<StorageBillingDoc> {
        storages
            .iter()
            .filter_map(|storage| match prices.storage_tiers(&storage.cloud_region) {
                Ok(tiers) => Some(Self::convert(storage, tiers, day)),
                Err(BillingError::PriceNotFound(region)) => {
                    tracing::warn!(
                        "Skipping storage {}: no price for region {}",
                        storage.name,
                        region
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping storage {}: {}", storage.name, e);
                    None
                }
            })
            .collect()
    }
}
