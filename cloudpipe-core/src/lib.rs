//! Cloudpipe Core
//!
//! Core types shared by the Cloudpipe services.
//!
//! This crate contains:
//! - Domain types: persisted entities (Folder, Pipeline, PipelineRun, etc.)
//! - DTOs: request/response bodies exchanged with the API server
//! - Billing: activity-period splitting and tiered price arithmetic

pub mod billing;
pub mod domain;
pub mod dto;
