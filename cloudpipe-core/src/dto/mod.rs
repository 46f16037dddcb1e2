//! Data Transfer Objects
//!
//! Request and response bodies of the API server. Responses that return a
//! whole entity use the domain type directly.

pub mod folder;
pub mod offer;
pub mod pipeline;
pub mod run;
pub mod schedule;
pub mod storage;
pub mod transfer;
