//! Cost computation in integer cost units

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::tier::{PriceTier, tiered_cost};

/// Cost values are stored as integers: 1 currency unit = 10 000 cost units
pub const COST_UNITS_PER_CURRENCY: i64 = 10_000;

const BYTES_PER_GB: i64 = 1024 * 1024 * 1024;

/// Cost of running `duration` at `price_per_hour`, counted in whole minutes
pub fn cost_for(duration: Duration, price_per_hour: Decimal) -> i64 {
    let minutes = Decimal::from(duration.num_minutes());
    to_cost_units(minutes * price_per_hour / Decimal::from(60))
}

/// One day's share of the monthly tiered price of `size_bytes`
pub fn daily_storage_cost(size_bytes: i64, tiers: &[PriceTier], day: NaiveDate) -> i64 {
    let size_gb = Decimal::from(size_bytes) / Decimal::from(BYTES_PER_GB);
    let monthly = tiered_cost(size_gb, tiers);
    to_cost_units(monthly / Decimal::from(days_in_month(day)))
}

pub fn days_in_month(day: NaiveDate) -> u32 {
    let (year, month) = (day.year(), day.month());
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

fn to_cost_units(amount: Decimal) -> i64 {
    (amount * Decimal::from(COST_UNITS_PER_CURRENCY))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_cost_for_hours() {
        // 2h at 0.096/h = 0.192
        assert_eq!(cost_for(Duration::hours(2), d("0.096")), 1920);
    }

    #[test]
    fn test_cost_for_truncates_seconds() {
        assert_eq!(
            cost_for(Duration::seconds(90), d("0.6")),
            cost_for(Duration::minutes(1), d("0.6"))
        );
        assert_eq!(cost_for(Duration::seconds(59), d("100")), 0);
    }

    #[test]
    fn test_cost_rounding() {
        // 1 minute at 0.0001/h = 0.0000016667 -> 0.0167 units -> 0
        assert_eq!(cost_for(Duration::minutes(1), d("0.0001")), 0);
        // 1 minute at 0.03/h = 0.0005 -> 5 units
        assert_eq!(cost_for(Duration::minutes(1), d("0.03")), 5);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2023, 2, 10)), 28);
        assert_eq!(days_in_month(date(2024, 12, 31)), 31);
        assert_eq!(days_in_month(date(2024, 4, 1)), 30);
    }

    #[test]
    fn test_daily_storage_cost() {
        let tiers = vec![PriceTier::flat(d("0.03"))];
        // 100 GB * 0.03 = 3.00 per month, 30 days in April -> 0.1 per day
        let cost = daily_storage_cost(100 * BYTES_PER_GB, &tiers, date(2024, 4, 15));
        assert_eq!(cost, 1000);
    }
}
