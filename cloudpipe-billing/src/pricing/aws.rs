//! AWS Price List offer files
//!
//! An offer file lists products by SKU and their on-demand terms separately.
//! EC2 files give instance offers, S3 files give storage tiers; several files
//! can be loaded into one table.

use async_trait::async_trait;
use cloudpipe_core::billing::PriceTier;
use cloudpipe_core::domain::offer::InstanceOffer;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{PriceLoader, PriceTable, normalize_tiers};
use crate::error::{Result, check_status};

const CURRENCY: &str = "USD";

pub struct AwsPriceListLoader {
    urls: Vec<String>,
    client: reqwest::Client,
}

impl AwsPriceListLoader {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PriceLoader for AwsPriceListLoader {
    fn name(&self) -> &'static str {
        "aws"
    }

    async fn load(&self) -> Result<PriceTable> {
        let mut table = PriceTable::default();

        for url in &self.urls {
            tracing::info!("Loading AWS offer file {}", url);
            let response = check_status(self.client.get(url).send().await?).await?;
            let file: OfferFile = response.json().await?;
            table.merge(parse_offer_file(file));
        }

        tracing::info!(
            "Loaded AWS prices: {} storage region(s), {} instance offer(s)",
            table.storage.len(),
            table.instances.len()
        );

        Ok(table)
    }
}

// =============================================================================
// Offer File Format
// =============================================================================

#[derive(Debug, Deserialize)]
struct OfferFile {
    #[serde(default)]
    products: HashMap<String, Product>,
    #[serde(default)]
    terms: Terms,
}

#[derive(Debug, Default, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand", default)]
    on_demand: HashMap<String, HashMap<String, OfferTerm>>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(rename = "productFamily")]
    product_family: Option<String>,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OfferTerm {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: HashMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
struct PriceDimension {
    #[serde(rename = "beginRange")]
    begin_range: Option<String>,
    #[serde(rename = "endRange")]
    end_range: Option<String>,
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: HashMap<String, String>,
}

impl Product {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn is_standard_storage(&self) -> bool {
        self.product_family.as_deref() == Some("Storage") && self.attr("volumeType") == Some("Standard")
    }

    /// Plain on-demand Linux capacity
    fn is_linux_instance(&self) -> bool {
        self.product_family.as_deref() == Some("Compute Instance")
            && self.attr("operatingSystem") == Some("Linux")
            && self.attr("tenancy") == Some("Shared")
            && self.attr("preInstalledSw") == Some("NA")
            && self.attr("capacitystatus") == Some("Used")
    }
}

fn parse_offer_file(file: OfferFile) -> PriceTable {
    let mut storage: HashMap<String, Vec<PriceTier>> = HashMap::new();
    let mut instances: HashMap<(String, String), InstanceOffer> = HashMap::new();

    for (sku, product) in &file.products {
        let Some(region) = product.attr("regionCode") else {
            continue;
        };
        let Some(terms) = file.terms.on_demand.get(sku) else {
            continue;
        };
        let dimensions = terms.values().flat_map(|term| term.price_dimensions.values());

        if product.is_standard_storage() {
            let tiers = dimensions.filter_map(|d| {
                let price = parse_price(d)?;
                let begin = d.begin_range.as_deref().and_then(parse_range).unwrap_or(Decimal::ZERO);
                let end = d.end_range.as_deref().and_then(parse_range);
                Some(PriceTier::new(begin, end, price))
            });
            storage.entry(region.to_string()).or_default().extend(tiers);
        } else if product.is_linux_instance() {
            let Some(instance_type) = product.attr("instanceType") else {
                continue;
            };
            let Some(price) = dimensions.filter_map(parse_price).find(|p| *p > Decimal::ZERO)
            else {
                continue;
            };

            let offer = InstanceOffer {
                instance_type: instance_type.to_string(),
                cloud_region: region.to_string(),
                price_per_hour: price,
                vcpu: product.attr("vcpu").and_then(|v| v.parse().ok()).unwrap_or(0),
                memory_gib: product.attr("memory").and_then(parse_memory).unwrap_or(0.0),
                gpu: product.attr("gpu").and_then(|v| v.parse().ok()).unwrap_or(0),
            };

            // Keep the cheapest SKU when several match
            instances
                .entry((offer.cloud_region.clone(), offer.instance_type.clone()))
                .and_modify(|existing| {
                    if offer.price_per_hour < existing.price_per_hour {
                        *existing = offer.clone();
                    }
                })
                .or_insert(offer);
        }
    }

    let mut instances: Vec<InstanceOffer> = instances.into_values().collect();
    instances.sort_by(|a, b| {
        (&a.cloud_region, &a.instance_type).cmp(&(&b.cloud_region, &b.instance_type))
    });

    PriceTable {
        storage: storage
            .into_iter()
            .map(|(region, tiers)| (region, normalize_tiers(tiers)))
            .collect(),
        instances,
    }
}

fn parse_price(dimension: &PriceDimension) -> Option<Decimal> {
    dimension.price_per_unit.get(CURRENCY)?.parse().ok()
}

/// "Inf" marks an open range
fn parse_range(value: &str) -> Option<Decimal> {
    if value.eq_ignore_ascii_case("inf") {
        return None;
    }
    value.parse().ok()
}

/// "8 GiB", "1,952 GiB"
fn parse_memory(value: &str) -> Option<f64> {
    value
        .split_whitespace()
        .next()?
        .replace(',', "")
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offer_file() -> serde_json::Value {
        json!({
            "products": {
                "EC2LINUX": {
                    "sku": "EC2LINUX",
                    "productFamily": "Compute Instance",
                    "attributes": {
                        "regionCode": "us-east-1",
                        "instanceType": "m5.large",
                        "operatingSystem": "Linux",
                        "tenancy": "Shared",
                        "preInstalledSw": "NA",
                        "capacitystatus": "Used",
                        "vcpu": "2",
                        "memory": "8 GiB"
                    }
                },
                "EC2WIN": {
                    "sku": "EC2WIN",
                    "productFamily": "Compute Instance",
                    "attributes": {
                        "regionCode": "us-east-1",
                        "instanceType": "m5.large",
                        "operatingSystem": "Windows",
                        "tenancy": "Shared",
                        "preInstalledSw": "NA",
                        "capacitystatus": "Used",
                        "vcpu": "2",
                        "memory": "8 GiB"
                    }
                },
                "S3STD": {
                    "sku": "S3STD",
                    "productFamily": "Storage",
                    "attributes": {
                        "regionCode": "us-east-1",
                        "volumeType": "Standard"
                    }
                }
            },
            "terms": {
                "OnDemand": {
                    "EC2LINUX": {
                        "EC2LINUX.JRTCKXETXF": {
                            "priceDimensions": {
                                "EC2LINUX.JRTCKXETXF.6YS6EN2CT7": {
                                    "unit": "Hrs",
                                    "beginRange": "0",
                                    "endRange": "Inf",
                                    "pricePerUnit": { "USD": "0.0960000000" }
                                }
                            }
                        }
                    },
                    "EC2WIN": {
                        "EC2WIN.JRTCKXETXF": {
                            "priceDimensions": {
                                "EC2WIN.JRTCKXETXF.6YS6EN2CT7": {
                                    "unit": "Hrs",
                                    "pricePerUnit": { "USD": "0.1880000000" }
                                }
                            }
                        }
                    },
                    "S3STD": {
                        "S3STD.JRTCKXETXF": {
                            "priceDimensions": {
                                "S3STD.JRTCKXETXF.PGHJ3S3EYE": {
                                    "unit": "GB-Mo",
                                    "beginRange": "51200",
                                    "endRange": "512000",
                                    "pricePerUnit": { "USD": "0.0220000000" }
                                },
                                "S3STD.JRTCKXETXF.D42MF2PVJS": {
                                    "unit": "GB-Mo",
                                    "beginRange": "0",
                                    "endRange": "51200",
                                    "pricePerUnit": { "USD": "0.0230000000" }
                                },
                                "S3STD.JRTCKXETXF.7J6UH2ZP6V": {
                                    "unit": "GB-Mo",
                                    "beginRange": "512000",
                                    "endRange": "Inf",
                                    "pricePerUnit": { "USD": "0.0210000000" }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_offer_file() {
        let file: OfferFile = serde_json::from_value(offer_file()).unwrap();
        let table = parse_offer_file(file);

        assert_eq!(table.instances.len(), 1);
        let offer = &table.instances[0];
        assert_eq!(offer.instance_type, "m5.large");
        assert_eq!(offer.price_per_hour, Decimal::new(96, 3));
        assert_eq!(offer.vcpu, 2);
        assert_eq!(offer.memory_gib, 8.0);

        let tiers = table.storage_tiers("us-east-1").unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].begin, Decimal::ZERO);
        assert_eq!(tiers[0].unit_price, Decimal::new(23, 3));
        assert_eq!(tiers[2].end, None);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory("8 GiB"), Some(8.0));
        assert_eq!(parse_memory("1,952 GiB"), Some(1952.0));
        assert_eq!(parse_memory("NA"), None);
    }

    #[tokio::test]
    async fn test_loader_merges_offer_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ec2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(offer_file()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/empty.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "products": {} })))
            .mount(&server)
            .await;

        let loader = AwsPriceListLoader::new(vec![
            format!("{}/ec2.json", server.uri()),
            format!("{}/empty.json", server.uri()),
        ]);
        let table = loader.load().await.unwrap();
        assert_eq!(table.instances.len(), 1);
        assert!(table.storage.contains_key("us-east-1"));
    }

    #[tokio::test]
    async fn test_loader_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Access Denied"))
            .mount(&server)
            .await;

        let loader = AwsPriceListLoader::new(vec![format!("{}/ec2.json", server.uri())]);
        assert!(matches!(
            loader.load().await,
            Err(crate::error::BillingError::ApiError { status: 403, .. })
        ));
    }
}
