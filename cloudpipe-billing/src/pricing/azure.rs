//! Azure RateCard storage prices
//!
//! Only hot LRS block blob storage is priced. Regions are keyed by the
//! RateCard `MeterRegion` display name.

use async_trait::async_trait;
use cloudpipe_core::billing::PriceTier;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{PriceLoader, PriceTable, normalize_tiers};
use crate::error::{BillingError, Result, check_status};

const METER_CATEGORY: &str = "Storage";
const METER_SUB_CATEGORY: &str = "General Block Blob";
const METER_NAME: &str = "Hot LRS Data Stored";

pub struct AzureRateCardLoader {
    url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl AzureRateCardLoader {
    pub fn new(url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PriceLoader for AzureRateCardLoader {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn load(&self) -> Result<PriceTable> {
        tracing::info!("Loading Azure rate card {}", self.url);

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = check_status(request.send().await?).await?;
        let rate_card: RateCard = response.json().await?;

        let table = parse_rate_card(rate_card)?;
        tracing::info!("Loaded Azure prices for {} region(s)", table.storage.len());
        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RateCard {
    #[serde(default)]
    meters: Vec<Meter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Meter {
    meter_category: Option<String>,
    meter_sub_category: Option<String>,
    meter_name: Option<String>,
    meter_region: Option<String>,
    meter_status: Option<String>,
    #[serde(default)]
    meter_rates: HashMap<String, serde_json::Number>,
}

impl Meter {
    fn is_hot_blob_storage(&self) -> bool {
        self.meter_category.as_deref() == Some(METER_CATEGORY)
            && self.meter_sub_category.as_deref() == Some(METER_SUB_CATEGORY)
            && self.meter_name.as_deref() == Some(METER_NAME)
            && self.meter_status.as_deref().is_none_or(|s| s == "Active")
    }

    /// Rates are keyed by the usage threshold they start at
    fn tiers(&self) -> Result<Vec<PriceTier>> {
        self.meter_rates
            .iter()
            .map(|(threshold, rate)| {
                let begin = parse_decimal(threshold)?;
                let unit_price = parse_decimal(&rate.to_string())?;
                Ok(PriceTier::new(begin, None, unit_price))
            })
            .collect()
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    value
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| BillingError::ParseError(format!("invalid number in rate card: {}", value)))
}

fn parse_rate_card(rate_card: RateCard) -> Result<PriceTable> {
    let mut storage = HashMap::new();

    for meter in rate_card.meters.iter().filter(|m| m.is_hot_blob_storage()) {
        let Some(region) = meter.meter_region.as_deref().filter(|r| !r.is_empty()) else {
            continue;
        };
        if storage.contains_key(region) {
            tracing::debug!("Duplicate storage meter for {}, keeping the first", region);
            continue;
        }
        storage.insert(region.to_string(), normalize_tiers(meter.tiers()?));
    }

    Ok(PriceTable {
        storage,
        instances: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rate_card() -> serde_json::Value {
        json!({
            "OfferTerms": [],
            "Currency": "USD",
            "Meters": [
                {
                    "MeterId": "a",
                    "MeterCategory": "Storage",
                    "MeterSubCategory": "General Block Blob",
                    "MeterName": "Hot LRS Data Stored",
                    "MeterRegion": "US East",
                    "MeterStatus": "Active",
                    "MeterRates": { "0": 0.0184, "51200": 0.0177, "512000": 0.017 },
                    "Unit": "1 GB/Month"
                },
                {
                    "MeterId": "b",
                    "MeterCategory": "Storage",
                    "MeterSubCategory": "General Block Blob",
                    "MeterName": "Cool LRS Data Stored",
                    "MeterRegion": "US East",
                    "MeterRates": { "0": 0.01 }
                },
                {
                    "MeterId": "c",
                    "MeterCategory": "Virtual Machines",
                    "MeterName": "D2 v3",
                    "MeterRegion": "US East",
                    "MeterRates": { "0": 0.096 }
                }
            ]
        })
    }

    #[test]
    fn test_parse_rate_card() {
        let rate_card: RateCard = serde_json::from_value(rate_card()).unwrap();
        let table = parse_rate_card(rate_card).unwrap();

        assert_eq!(table.storage.len(), 1);
        assert!(table.instances.is_empty());

        let tiers = table.storage_tiers("US East").unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].unit_price, Decimal::new(184, 4));
        assert_eq!(tiers[0].end, Some(Decimal::from(51_200)));
        assert_eq!(tiers[2].begin, Decimal::from(512_000));
        assert_eq!(tiers[2].end, None);
    }

    #[tokio::test]
    async fn test_loader_sends_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ratecard"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rate_card()))
            .expect(1)
            .mount(&server)
            .await;

        let loader = AzureRateCardLoader::new(
            format!("{}/ratecard", server.uri()),
            Some("secret".to_string()),
        );
        let table = loader.load().await.unwrap();
        assert!(table.storage.contains_key("US East"));
    }
}
