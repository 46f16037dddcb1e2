//! Cloud price lists
//!
//! Each provider publishes prices in its own JSON format. Loaders turn them
//! into a [`PriceTable`]: tiered storage prices per region plus on-demand
//! instance offers. The [`PriceCache`] keeps the last table and reloads it
//! once it is older than the refresh interval.

pub mod aws;
pub mod azure;
pub mod cache;
pub mod gcp;

pub use aws::AwsPriceListLoader;
pub use azure::AzureRateCardLoader;
pub use cache::PriceCache;
pub use gcp::GcpBillingLoader;

use async_trait::async_trait;
use cloudpipe_core::billing::PriceTier;
use cloudpipe_core::domain::offer::InstanceOffer;
use std::collections::{BTreeMap, HashMap};

use crate::error::{BillingError, Result};

/// Prices known for one provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    /// Storage price tiers (per GB-month) by region
    pub storage: HashMap<String, Vec<PriceTier>>,
    /// On-demand instance offers of all regions
    pub instances: Vec<InstanceOffer>,
}

impl PriceTable {
    /// Storage tiers of a region, ordered by `begin`
    pub fn storage_tiers(&self, region: &str) -> Result<&[PriceTier]> {
        self.storage
            .get(region)
            .map(Vec::as_slice)
            .ok_or_else(|| BillingError::PriceNotFound(region.to_string()))
    }

    /// Instance offers grouped by region
    pub fn offers_by_region(&self) -> BTreeMap<&str, Vec<InstanceOffer>> {
        let mut regions: BTreeMap<&str, Vec<InstanceOffer>> = BTreeMap::new();
        for offer in &self.instances {
            regions
                .entry(offer.cloud_region.as_str())
                .or_default()
                .push(offer.clone());
        }
        regions
    }

    /// Add another table's prices; regions already present are replaced
    pub fn merge(&mut self, other: PriceTable) {
        self.storage.extend(other.storage);
        self.instances.extend(other.instances);
    }
}

/// A source of cloud prices
#[async_trait]
pub trait PriceLoader: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn load(&self) -> Result<PriceTable>;
}

/// Sort tiers and close every bounded tier at the start of the next one
pub(crate) fn normalize_tiers(mut tiers: Vec<PriceTier>) -> Vec<PriceTier> {
    tiers.sort_by(|a, b| a.begin.cmp(&b.begin));
    tiers.dedup_by(|a, b| a.begin == b.begin);

    let starts: Vec<_> = tiers.iter().skip(1).map(|t| t.begin).collect();
    for (tier, next_begin) in tiers.iter_mut().zip(starts) {
        if tier.end.is_none_or(|end| end > next_begin) {
            tier.end = Some(next_begin);
        }
    }
    if let Some(last) = tiers.last_mut() {
        if last.end.is_some_and(|end| end <= last.begin) {
            last.end = None;
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn offer(region: &str, instance_type: &str) -> InstanceOffer {
        InstanceOffer {
            instance_type: instance_type.to_string(),
            cloud_region: region.to_string(),
            price_per_hour: Decimal::ONE,
            vcpu: 2,
            memory_gib: 4.0,
            gpu: 0,
        }
    }

    #[test]
    fn test_storage_tiers_unknown_region() {
        let table = PriceTable::default();
        assert!(matches!(
            table.storage_tiers("mars-1"),
            Err(BillingError::PriceNotFound(region)) if region == "mars-1"
        ));
    }

    #[test]
    fn test_offers_by_region() {
        let table = PriceTable {
            storage: HashMap::new(),
            instances: vec![
                offer("us-east-1", "m5.large"),
                offer("eu-west-1", "m5.large"),
                offer("us-east-1", "c5.xlarge"),
            ],
        };

        let regions = table.offers_by_region();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions["us-east-1"].len(), 2);
        assert_eq!(regions["eu-west-1"].len(), 1);
    }

    #[test]
    fn test_normalize_tiers_closes_open_tiers() {
        let tiers = normalize_tiers(vec![
            PriceTier::new(Decimal::from(51_200), None, Decimal::new(22, 3)),
            PriceTier::new(Decimal::ZERO, None, Decimal::new(23, 3)),
        ]);

        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].begin, Decimal::ZERO);
        assert_eq!(tiers[0].end, Some(Decimal::from(51_200)));
        assert_eq!(tiers[1].end, None);
    }
}
