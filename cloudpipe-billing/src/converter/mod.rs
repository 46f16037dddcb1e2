//! Conversion of platform records into per-day billing documents

pub mod run;
pub mod storage;

pub use run::RunBillingConverter;
pub use storage::StorageBillingConverter;
