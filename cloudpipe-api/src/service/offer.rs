//! Instance Offer Service

use cloudpipe_core::domain::offer::InstanceOffer;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::repository::offer_repository;

/// Service error type
#[derive(Debug)]
pub enum OfferError {
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for OfferError {
    fn from(err: sqlx::Error) -> Self {
        OfferError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, OfferError>;

/// Replace all offers of a region with a freshly loaded list
pub async fn replace_offers(
    pool: &PgPool,
    region: &str,
    offers: Vec<InstanceOffer>,
) -> Result<Vec<InstanceOffer>> {
    validate_offers(region, &offers)?;

    let stored = offer_repository::replace_region(pool, region, &offers).await?;
    tracing::info!("Replaced offers of region {}: {} stored", region, stored);

    list_offers(pool, region).await
}

/// List the offers of a region
pub async fn list_offers(pool: &PgPool, region: &str) -> Result<Vec<InstanceOffer>> {
    let offers = offer_repository::list_by_region(pool, region).await?;
    Ok(offers)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_offers(region: &str, offers: &[InstanceOffer]) -> Result<()> {
    if region.trim().is_empty() {
        return Err(OfferError::ValidationError(
            "Region cannot be empty".to_string(),
        ));
    }

    for offer in offers {
        if offer.cloud_region != region {
            return Err(OfferError::ValidationError(format!(
                "Offer {} belongs to region {}, not {}",
                offer.instance_type, offer.cloud_region, region
            )));
        }
        if offer.instance_type.trim().is_empty() {
            return Err(OfferError::ValidationError(
                "Instance type cannot be empty".to_string(),
            ));
        }
        if offer.price_per_hour < Decimal::ZERO {
            return Err(OfferError::ValidationError(format!(
                "Negative price for {}",
                offer.instance_type
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(region: &str, instance_type: &str, price: Decimal) -> InstanceOffer {
        InstanceOffer {
            instance_type: instance_type.to_string(),
            cloud_region: region.to_string(),
            price_per_hour: price,
            vcpu: 2,
            memory_gib: 8.0,
            gpu: 0,
        }
    }

    #[test]
    fn test_validate_offers() {
        let price = Decimal::new(96, 3);
        assert!(validate_offers("us-east-1", &[offer("us-east-1", "m5.large", price)]).is_ok());
        assert!(validate_offers("us-east-1", &[]).is_ok());
        assert!(validate_offers("us-east-1", &[offer("eu-west-1", "m5.large", price)]).is_err());
        assert!(
            validate_offers("us-east-1", &[offer("us-east-1", "m5.large", Decimal::NEGATIVE_ONE)])
                .is_err()
        );
        assert!(validate_offers("", &[]).is_err());
    }
}
