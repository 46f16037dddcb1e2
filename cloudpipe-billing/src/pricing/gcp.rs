//! GCP Cloud Billing catalog storage prices
//!
//! The SKU list of the Cloud Storage service is paged; every page is fetched
//! before the table is built.

use async_trait::async_trait;
use cloudpipe_core::billing::PriceTier;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{PriceLoader, PriceTable, normalize_tiers};
use crate::error::{BillingError, Result, check_status};

const RESOURCE_FAMILY: &str = "Storage";
const RESOURCE_GROUP: &str = "RegionalStorage";
const USAGE_UNIT: &str = "GiBy.mo";
const MAX_PAGES: usize = 100;

pub struct GcpBillingLoader {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GcpBillingLoader {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<SkuPage> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(key) = &self.api_key {
            params.push(("key", key));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = self.client.get(&self.url).query(&params).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PriceLoader for GcpBillingLoader {
    fn name(&self) -> &'static str {
        "gcp"
    }

    async fn load(&self) -> Result<PriceTable> {
        tracing::info!("Loading GCP SKUs from {}", self.url);

        let mut skus = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(page_token.as_deref()).await?;
            skus.extend(page.skus);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => {
                    let table = parse_skus(&skus)?;
                    tracing::info!("Loaded GCP prices for {} region(s)", table.storage.len());
                    return Ok(table);
                }
            }
        }

        Err(BillingError::ParseError(format!(
            "SKU list did not end after {} pages",
            MAX_PAGES
        )))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkuPage {
    #[serde(default)]
    skus: Vec<Sku>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sku {
    category: Category,
    #[serde(default)]
    service_regions: Vec<String>,
    #[serde(default)]
    pricing_info: Vec<PricingInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Category {
    resource_family: Option<String>,
    resource_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingInfo {
    pricing_expression: PricingExpression,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingExpression {
    usage_unit: Option<String>,
    #[serde(default)]
    tiered_rates: Vec<TieredRate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TieredRate {
    start_usage_amount: Option<serde_json::Number>,
    unit_price: Money,
}

/// `units` is an int64 encoded as a string
#[derive(Debug, Deserialize)]
struct Money {
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    nanos: i32,
}

impl Money {
    fn to_decimal(&self) -> Result<Decimal> {
        let units = match self.units.as_deref() {
            Some(units) => units
                .parse::<i64>()
                .map_err(|_| BillingError::ParseError(format!("invalid units: {}", units)))?,
            None => 0,
        };
        Ok(Decimal::from(units) + Decimal::new(self.nanos as i64, 9))
    }
}

impl Sku {
    fn is_regional_storage(&self) -> bool {
        self.category.resource_family.as_deref() == Some(RESOURCE_FAMILY)
            && self.category.resource_group.as_deref() == Some(RESOURCE_GROUP)
    }

    fn tiers(&self) -> Result<Option<Vec<PriceTier>>> {
        let Some(expression) = self
            .pricing_info
            .iter()
            .map(|info| &info.pricing_expression)
            .find(|e| e.usage_unit.as_deref() == Some(USAGE_UNIT))
        else {
            return Ok(None);
        };

        let tiers = expression
            .tiered_rates
            .iter()
            .map(|rate| {
                let begin = match &rate.start_usage_amount {
                    Some(amount) => amount
                        .to_string()
                        .parse::<Decimal>()
                        .map_err(|e| BillingError::ParseError(e.to_string()))?,
                    None => Decimal::ZERO,
                };
                Ok(PriceTier::new(begin, None, rate.unit_price.to_decimal()?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(normalize_tiers(tiers)))
    }
}

fn parse_skus(skus: &[Sku]) -> Result<PriceTable> {
    let mut storage: HashMap<String, Vec<PriceTier>> = HashMap::new();

    for sku in skus.iter().filter(|s| s.is_regional_storage()) {
        let Some(tiers) = sku.tiers()? else {
            continue;
        };
        for region in &sku.service_regions {
            storage.entry(region.clone()).or_insert_with(|| tiers.clone());
        }
    }

    Ok(PriceTable {
        storage,
        instances: Vec::new(),
    })
}
