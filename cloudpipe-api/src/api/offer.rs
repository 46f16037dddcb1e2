//! Instance Offer API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use cloudpipe_core::domain::offer::InstanceOffer;
use cloudpipe_core::dto::offer::UpsertInstanceOffers;

use crate::AppState;
use crate::api::error::ApiResult;
use crate::service::offer_service;

/// GET /instance/offers/{region}
pub async fn list_offers(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Json<Vec<InstanceOffer>>> {
    let offers = offer_service::list_offers(&state.pool, &region).await?;
    Ok(Json(offers))
}

/// PUT /instance/offers/{region}
/// Replace the region's offers
pub async fn replace_offers(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Json(req): Json<UpsertInstanceOffers>,
) -> ApiResult<Json<Vec<InstanceOffer>>> {
    tracing::info!("Replacing {} offers of region {}", req.offers.len(), region);

    let offers = offer_service::replace_offers(&state.pool, &region, req.offers).await?;
    Ok(Json(offers))
}
