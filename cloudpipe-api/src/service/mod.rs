//! Service Module
//!
//! Business logic layer for the API server.
//! Services orchestrate between repositories and contain domain logic.

pub mod folder;
pub mod offer;
pub mod pipeline;
pub mod run;
pub mod schedule;
pub mod storage;
pub mod transfer;

// Re-export for convenience
pub use folder as folder_service;
pub use offer as offer_service;
pub use pipeline as pipeline_service;
pub use run as run_service;
pub use schedule as schedule_service;
pub use storage as storage_service;
pub use transfer as transfer_service;
