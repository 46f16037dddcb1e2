use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod repository;
pub mod service;

use crate::config::Config;
use crate::dispatcher::ScheduleDispatcher;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub pricing: service::run::PricingSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudpipe_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cloudpipe API server...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let state = AppState {
        pool,
        pricing: service::run::PricingSettings {
            storage_gb_month_price: config.storage_gb_month_price,
        },
    };

    // Cron-triggered run actions
    let dispatcher = ScheduleDispatcher::new(state.clone(), config.schedule_poll_interval);
    tokio::spawn(async move { dispatcher.run().await });

    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
