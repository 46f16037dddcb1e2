//! Instance offer DTOs

use serde::{Deserialize, Serialize};

use crate::domain::offer::InstanceOffer;

/// Full replacement of a region's offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertInstanceOffers {
    pub offers: Vec<InstanceOffer>,
}
