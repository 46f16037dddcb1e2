//! Core domain types
//!
//! These records map one-to-one onto rows of the API server schema and are
//! shared with every client of that server (CLI, billing agent, transfer runner).

pub mod folder;
pub mod offer;
pub mod pipeline;
pub mod run;
pub mod schedule;
pub mod storage;
pub mod transfer;
