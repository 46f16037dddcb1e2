//! Instance Offer Repository
//!
//! Offers are replaced region by region whenever fresh prices are loaded.

use cloudpipe_core::domain::offer::InstanceOffer;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Replace every offer of a region in one transaction
pub async fn replace_region(
    pool: &PgPool,
    region: &str,
    offers: &[InstanceOffer],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM instance_offers WHERE cloud_region = $1")
        .bind(region)
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for offer in offers {
        let result = sqlx::query(
            r#"
            INSERT INTO instance_offers (cloud_region, instance_type, price_per_hour, vcpu, memory_gib, gpu)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cloud_region, instance_type) DO UPDATE
            SET price_per_hour = EXCLUDED.price_per_hour, vcpu = EXCLUDED.vcpu,
                memory_gib = EXCLUDED.memory_gib, gpu = EXCLUDED.gpu
            "#,
        )
        .bind(region)
        .bind(&offer.instance_type)
        .bind(offer.price_per_hour)
        .bind(offer.vcpu)
        .bind(offer.memory_gib)
        .bind(offer.gpu)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Find the offer of an instance type in a region
pub async fn find(
    pool: &PgPool,
    region: &str,
    instance_type: &str,
) -> Result<Option<InstanceOffer>, sqlx::Error> {
    let row = sqlx::query_as::<_, OfferRow>(
        r#"
        SELECT cloud_region, instance_type, price_per_hour, vcpu, memory_gib, gpu
        FROM instance_offers
        WHERE cloud_region = $1 AND instance_type = $2
        "#,
    )
    .bind(region)
    .bind(instance_type)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// List the offers of a region, cheapest first
pub async fn list_by_region(pool: &PgPool, region: &str) -> Result<Vec<InstanceOffer>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OfferRow>(
        r#"
        SELECT cloud_region, instance_type, price_per_hour, vcpu, memory_gib, gpu
        FROM instance_offers
        WHERE cloud_region = $1
        ORDER BY price_per_hour ASC, instance_type ASC
        "#,
    )
    .bind(region)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct OfferRow {
    cloud_region: String,
    instance_type: String,
    price_per_hour: Decimal,
    vcpu: i32,
    memory_gib: f64,
    gpu: i32,
}

impl From<OfferRow> for InstanceOffer {
    fn from(row: OfferRow) -> Self {
        InstanceOffer {
            instance_type: row.instance_type,
            cloud_region: row.cloud_region,
            price_per_hour: row.price_per_hour,
            vcpu: row.vcpu,
            memory_gib: row.memory_gib,
            gpu: row.gpu,
        }
    }
}
