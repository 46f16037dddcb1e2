//! Instance offer API endpoints

use crate::ApiClient;
use crate::error::Result;
use cloudpipe_core::domain::offer::InstanceOffer;
use cloudpipe_core::dto::offer::UpsertInstanceOffers;

impl ApiClient {
    /// Offers of a region, cheapest first
    pub async fn list_offers(&self, region: &str) -> Result<Vec<InstanceOffer>> {
        let url = format!("{}/instance/offers/{}", self.base_url, region);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Replace every offer of a region
    pub async fn replace_offers(
        &self,
        region: &str,
        offers: Vec<InstanceOffer>,
    ) -> Result<Vec<InstanceOffer>> {
        let url = format!("{}/instance/offers/{}", self.base_url, region);
        let response = self
            .client
            .put(&url)
            .json(&UpsertInstanceOffers { offers })
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::ApiClient;
    use cloudpipe_core::domain::offer::InstanceOffer;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_replace_offers_puts_region_list() {
        let server = MockServer::start().await;
        let offer = InstanceOffer {
            instance_type: "m5.large".to_string(),
            cloud_region: "us-east-1".to_string(),
            price_per_hour: Decimal::new(96, 3),
            vcpu: 2,
            memory_gib: 8.0,
            gpu: 0,
        };

        Mock::given(method("PUT"))
            .and(path("/instance/offers/us-east-1"))
            .and(body_partial_json(json!({
                "offers": [{ "instance_type": "m5.large", "price_per_hour": "0.096" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([offer])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let stored = client
            .replace_offers("us-east-1", vec![offer.clone()])
            .await
            .unwrap();
        assert_eq!(stored, vec![offer]);
    }
}
