//! Billing arithmetic
//!
//! Pure functions shared by the billing agent: splitting a run's lifetime into
//! billable activity periods, apportioning them per day, and pricing usage
//! against tiered price lists. Costs are integers in [`COST_UNITS_PER_CURRENCY`]
//! fractions of a currency unit.

pub mod cost;
pub mod doc;
pub mod period;
pub mod tier;

pub use cost::{COST_UNITS_PER_CURRENCY, cost_for, daily_storage_cost, days_in_month};
pub use doc::{RunBillingDoc, StorageBillingDoc};
pub use period::{ActivityPeriod, activity_periods, lifetime_period, split_by_day};
pub use tier::{PriceTier, tiered_cost};
