//! Pipeline Run Repository
//!
//! Handles all database operations related to pipeline runs. Functions that
//! take part in a launch or status change accept any executor so the service
//! can run them inside a transaction.

use cloudpipe_core::domain::run::{PipelineRun, RunInstance, RunPrices, TaskStatus};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const RUN_COLUMNS: &str = r#"
    id, pipeline_id, version, owner, status, start_date, end_date, node_type,
    cloud_region, disk_size_gb, spot, compute_price_per_hour, disk_price_per_hour,
    parameters, parent_run_id
"#;

/// Insert a new run
pub async fn create<'e, E>(executor: E, run: &PipelineRun) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (
            id, pipeline_id, version, owner, status, start_date, end_date, node_type,
            cloud_region, disk_size_gb, spot, compute_price_per_hour, disk_price_per_hour,
            parameters, parent_run_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(run.id)
    .bind(run.pipeline_id)
    .bind(&run.version)
    .bind(&run.owner)
    .bind(run.status.as_str())
    .bind(run.start_date)
    .bind(run.end_date)
    .bind(&run.instance.node_type)
    .bind(&run.instance.cloud_region)
    .bind(run.instance.disk_size_gb)
    .bind(run.instance.spot)
    .bind(run.prices.compute_price_per_hour)
    .bind(run.prices.disk_price_per_hour)
    .bind(Json(&run.parameters))
    .bind(run.parent_run_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Find a run by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error> {
    let query = format!("SELECT {} FROM pipeline_runs WHERE id = $1", RUN_COLUMNS);
    let row = sqlx::query_as::<_, RunRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Into::into))
}

/// Find runs of a pipeline, newest first
pub async fn list_by_pipeline(
    pool: &PgPool,
    pipeline_id: Uuid,
) -> Result<Vec<PipelineRun>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM pipeline_runs WHERE pipeline_id = $1 ORDER BY start_date DESC",
        RUN_COLUMNS
    );
    let rows = sqlx::query_as::<_, RunRow>(&query)
        .bind(pipeline_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Most recent run of a pipeline
pub async fn latest_for_pipeline(
    pool: &PgPool,
    pipeline_id: Uuid,
) -> Result<Option<PipelineRun>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM pipeline_runs WHERE pipeline_id = $1 ORDER BY start_date DESC LIMIT 1",
        RUN_COLUMNS
    );
    let row = sqlx::query_as::<_, RunRow>(&query)
        .bind(pipeline_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Into::into))
}

/// Runs that have not reached a final status
pub async fn list_active(pool: &PgPool) -> Result<Vec<PipelineRun>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM pipeline_runs WHERE status NOT IN ('Stopped', 'Failure', 'Success') ORDER BY start_date ASC",
        RUN_COLUMNS
    );
    let rows = sqlx::query_as::<_, RunRow>(&query)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Runs whose lifetime intersects `[from, to)`
pub async fn list_in_period(
    pool: &PgPool,
    from: chrono::DateTime<chrono::Utc>,
    to: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<PipelineRun>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {} FROM pipeline_runs
        WHERE start_date < $2 AND (end_date IS NULL OR end_date >= $1)
        ORDER BY start_date ASC
        "#,
        RUN_COLUMNS
    );
    let rows = sqlx::query_as::<_, RunRow>(&query)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Move the run from `from` to `to`; `end_date` is only written when given.
///
/// Returns false when the run is no longer in `from`.
pub async fn update_status<'e, E>(
    executor: E,
    id: Uuid,
    from: TaskStatus,
    to: TaskStatus,
    end_date: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE pipeline_runs
        SET status = $1, end_date = COALESCE($2, end_date)
        WHERE id = $3 AND status = $4
        "#,
    )
    .bind(to.as_str())
    .bind(end_date)
    .bind(id)
    .bind(from.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a run by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pipeline_runs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    pipeline_id: Option<Uuid>,
    version: Option<String>,
    owner: String,
    status: String,
    start_date: chrono::DateTime<chrono::Utc>,
    end_date: Option<chrono::DateTime<chrono::Utc>>,
    node_type: String,
    cloud_region: String,
    disk_size_gb: i32,
    spot: bool,
    compute_price_per_hour: Decimal,
    disk_price_per_hour: Decimal,
    parameters: Json<HashMap<String, String>>,
    parent_run_id: Option<Uuid>,
}

impl From<RunRow> for PipelineRun {
    fn from(row: RunRow) -> Self {
        PipelineRun {
            id: row.id,
            pipeline_id: row.pipeline_id,
            version: row.version,
            owner: row.owner,
            // Unknown values only appear if the column was edited by hand
            status: TaskStatus::parse(&row.status).unwrap_or(TaskStatus::Failure),
            start_date: row.start_date,
            end_date: row.end_date,
            instance: RunInstance {
                node_type: row.node_type,
                cloud_region: row.cloud_region,
                disk_size_gb: row.disk_size_gb,
                spot: row.spot,
            },
            prices: RunPrices {
                compute_price_per_hour: row.compute_price_per_hour,
                disk_price_per_hour: row.disk_price_per_hour,
            },
            parameters: row.parameters.0,
            parent_run_id: row.parent_run_id,
            status_history: Vec::new(),
        }
    }
}
