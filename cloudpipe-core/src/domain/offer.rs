//! Instance offer domain types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// On-demand price of an instance type in a cloud region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceOffer {
    pub instance_type: String,
    pub cloud_region: String,
    pub price_per_hour: Decimal,
    pub vcpu: i32,
    pub memory_gib: f64,
    pub gpu: i32,
}
