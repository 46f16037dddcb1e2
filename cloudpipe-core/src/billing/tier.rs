//! Tiered unit pricing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit price applied to the part of the usage between `begin` and `end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub begin: Decimal,
    /// `None` for the last, unbounded tier
    pub end: Option<Decimal>,
    pub unit_price: Decimal,
}

impl PriceTier {
    pub fn new(begin: Decimal, end: Option<Decimal>, unit_price: Decimal) -> Self {
        Self {
            begin,
            end,
            unit_price,
        }
    }

    /// Flat price for any quantity
    pub fn flat(unit_price: Decimal) -> Self {
        Self::new(Decimal::ZERO, None, unit_price)
    }
}

/// Price of `quantity` units against a tiered price list.
///
/// Each tier charges its unit price for the part of `[0, quantity)` it covers.
pub fn tiered_cost(quantity: Decimal, tiers: &[PriceTier]) -> Decimal {
    if quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    tiers
        .iter()
        .map(|tier| {
            let lower = tier.begin.max(Decimal::ZERO);
            let upper = tier.end.map_or(quantity, |end| end.min(quantity));
            if upper > lower {
                (upper - lower) * tier.unit_price
            } else {
                Decimal::ZERO
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn s3_like() -> Vec<PriceTier> {
        vec![
            PriceTier::new(d("0"), Some(d("51200")), d("0.023")),
            PriceTier::new(d("51200"), Some(d("512000")), d("0.022")),
            PriceTier::new(d("512000"), None, d("0.021")),
        ]
    }

    #[test]
    fn test_usage_within_first_tier() {
        assert_eq!(tiered_cost(d("100"), &s3_like()), d("2.3"));
    }

    #[test]
    fn test_usage_spanning_tiers() {
        // 51200 * 0.023 + 8800 * 0.022
        assert_eq!(tiered_cost(d("60000"), &s3_like()), d("1371.2"));
    }

    #[test]
    fn test_unbounded_last_tier() {
        // 51200 * 0.023 + 460800 * 0.022 + 88000 * 0.021
        assert_eq!(tiered_cost(d("600000"), &s3_like()), d("13163.2"));
    }

    #[test]
    fn test_zero_and_negative_usage_is_free() {
        assert_eq!(tiered_cost(Decimal::ZERO, &s3_like()), Decimal::ZERO);
        assert_eq!(tiered_cost(d("-5"), &s3_like()), Decimal::ZERO);
    }

    #[test]
    fn test_gap_between_tiers_is_free() {
        let tiers = vec![
            PriceTier::new(d("0"), Some(d("5")), Decimal::ZERO),
            PriceTier::new(d("10"), None, d("1")),
        ];
        assert_eq!(tiered_cost(d("12"), &tiers), d("2"));
    }
}
