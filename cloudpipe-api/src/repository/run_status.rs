//! Run Status Repository
//!
//! Append-only log of run status changes.

use cloudpipe_core::domain::run::{RunStatus, TaskStatus};
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Record a status change
pub async fn insert<'e, E>(executor: E, run_id: Uuid, status: &RunStatus) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO run_status_changes (run_id, status, timestamp)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(run_id)
    .bind(status.status.as_str())
    .bind(status.timestamp)
    .execute(executor)
    .await?;

    Ok(())
}

/// Status history of one run, oldest first
pub async fn list_for_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<RunStatus>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT run_id, status, timestamp
        FROM run_status_changes
        WHERE run_id = $1
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(StatusRow::into_status).collect())
}

/// Status histories of several runs in one query, grouped by run
pub async fn list_for_runs(
    pool: &PgPool,
    run_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<RunStatus>>, sqlx::Error> {
    if run_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT run_id, status, timestamp
        FROM run_status_changes
        WHERE run_id = ANY($1)
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(run_ids)
    .fetch_all(pool)
    .await?;

    let mut histories: HashMap<Uuid, Vec<RunStatus>> = HashMap::new();
    for row in rows {
        let run_id = row.run_id;
        if let Some(status) = row.into_status() {
            histories.entry(run_id).or_default().push(status);
        }
    }

    Ok(histories)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StatusRow {
    run_id: Uuid,
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl StatusRow {
    fn into_status(self) -> Option<RunStatus> {
        let status = TaskStatus::parse(&self.status);
        if status.is_none() {
            tracing::warn!("Skipping unknown status '{}' of run {}", self.status, self.run_id);
        }
        status.map(|status| RunStatus {
            status,
            timestamp: self.timestamp,
        })
    }
}
