//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod folder;
pub mod health;
pub mod offer;
pub mod pipeline;
pub mod run;
pub mod schedule;
pub mod storage;
pub mod transfer;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Folder endpoints
        .route(
            "/folder",
            post(folder::create_folder).get(folder::folder_tree),
        )
        .route(
            "/folder/{id}",
            get(folder::get_folder)
                .put(folder::rename_folder)
                .delete(folder::delete_folder),
        )
        // Pipeline endpoints
        .route("/pipeline/create", post(pipeline::create_pipeline))
        .route("/pipeline/list", get(pipeline::list_pipelines))
        .route(
            "/pipeline/{id}",
            get(pipeline::get_pipeline)
                .put(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        .route("/pipeline/{id}/move", put(pipeline::move_pipeline))
        .route("/pipeline/{id}/versions", get(pipeline::list_versions))
        .route("/pipeline/{id}/source", get(pipeline::list_source))
        .route(
            "/pipeline/{id}/file",
            get(pipeline::get_source_file).put(pipeline::commit_source_file),
        )
        // Run endpoints
        .route("/run", post(run::launch_run))
        .route("/run/filter", get(run::list_runs_in_period))
        .route("/run/active", get(run::list_active_runs))
        .route("/run/{id}", get(run::get_run).delete(run::delete_run))
        .route("/run/{id}/status", post(run::update_status))
        .route("/run/{id}/stop", post(run::stop_run))
        .route("/run/{id}/pause", post(run::pause_run))
        .route("/run/{id}/resume", post(run::resume_run))
        .route(
            "/run/pipeline/{pipeline_id}",
            get(run::list_runs_by_pipeline),
        )
        // Schedule endpoints
        .route(
            "/schedule",
            post(schedule::create_schedule).get(schedule::list_schedules),
        )
        .route(
            "/schedule/{id}",
            get(schedule::get_schedule).delete(schedule::delete_schedule),
        )
        // Instance offers
        .route(
            "/instance/offers/{region}",
            get(offer::list_offers).put(offer::replace_offers),
        )
        // Storage endpoints
        .route(
            "/storage",
            post(storage::create_storage).get(storage::list_storages),
        )
        .route(
            "/storage/{id}",
            get(storage::get_storage).delete(storage::delete_storage),
        )
        .route("/storage/{id}/usage", put(storage::update_usage))
        // Transfer endpoints
        .route(
            "/transfer",
            post(transfer::create_transfer).get(transfer::list_transfers),
        )
        .route(
            "/transfer/{id}",
            get(transfer::get_transfer).delete(transfer::delete_transfer),
        )
        .route("/transfer/{id}/claim", post(transfer::claim_transfer))
        .route("/transfer/{id}/finish", post(transfer::finish_transfer))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
