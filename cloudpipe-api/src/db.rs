use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS folders (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        parent_id UUID REFERENCES folders(id) ON DELETE RESTRICT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    // NULL parents collapse onto one key so root names stay unique too
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_folders_parent_name
    ON folders (COALESCE(parent_id, '00000000-0000-0000-0000-000000000000'::uuid), name)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pipelines (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        description TEXT,
        folder_id UUID REFERENCES folders(id) ON DELETE RESTRICT,
        repository_kind VARCHAR(20),
        repository_url TEXT,
        repository_project TEXT,
        repository_token TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pipelines_folder_id ON pipelines(folder_id)",
    r#"
    CREATE TABLE IF NOT EXISTS pipeline_runs (
        id UUID PRIMARY KEY,
        pipeline_id UUID REFERENCES pipelines(id) ON DELETE SET NULL,
        version VARCHAR(255),
        owner VARCHAR(255) NOT NULL,
        status VARCHAR(50) NOT NULL,
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ,
        node_type VARCHAR(100) NOT NULL,
        cloud_region VARCHAR(100) NOT NULL,
        disk_size_gb INTEGER NOT NULL,
        spot BOOLEAN NOT NULL DEFAULT FALSE,
        compute_price_per_hour NUMERIC(14, 6) NOT NULL,
        disk_price_per_hour NUMERIC(14, 6) NOT NULL,
        parameters JSONB NOT NULL DEFAULT '{}',
        parent_run_id UUID REFERENCES pipeline_runs(id) ON DELETE SET NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_runs_status ON pipeline_runs(status)",
    "CREATE INDEX IF NOT EXISTS idx_runs_pipeline_id ON pipeline_runs(pipeline_id)",
    "CREATE INDEX IF NOT EXISTS idx_runs_period ON pipeline_runs(start_date, end_date)",
    r#"
    CREATE TABLE IF NOT EXISTS run_status_changes (
        id BIGSERIAL PRIMARY KEY,
        run_id UUID NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
        status VARCHAR(50) NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_run_status_run_id ON run_status_changes(run_id, timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS run_schedules (
        id UUID PRIMARY KEY,
        target_type VARCHAR(20) NOT NULL,
        target_id UUID NOT NULL,
        action VARCHAR(20) NOT NULL,
        cron_expression VARCHAR(255) NOT NULL,
        time_zone VARCHAR(64) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        last_fired_at TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_schedules_target ON run_schedules(target_type, target_id)",
    r#"
    CREATE TABLE IF NOT EXISTS instance_offers (
        cloud_region VARCHAR(100) NOT NULL,
        instance_type VARCHAR(100) NOT NULL,
        price_per_hour NUMERIC(14, 6) NOT NULL,
        vcpu INTEGER NOT NULL,
        memory_gib DOUBLE PRECISION NOT NULL,
        gpu INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (cloud_region, instance_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS data_storages (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        kind VARCHAR(20) NOT NULL,
        cloud_region VARCHAR(100) NOT NULL,
        path TEXT NOT NULL,
        size_bytes BIGINT NOT NULL DEFAULT 0,
        usage_updated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transfer_tasks (
        id UUID PRIMARY KEY,
        source TEXT NOT NULL,
        destination TEXT NOT NULL,
        status VARCHAR(20) NOT NULL,
        reason TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        started_at TIMESTAMPTZ,
        finished_at TIMESTAMPTZ,
        runner_id VARCHAR(255)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transfer_tasks_status ON transfer_tasks(status, created_at)",
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for &statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
