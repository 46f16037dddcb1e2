//! Transfer Task Repository
//!
//! Tasks are claimed by runners with a conditional update so that two
//! runners polling at the same time never both start the same task.

use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::CreateTransferTask;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new transfer task in `Created` status
pub async fn create(pool: &PgPool, req: CreateTransferTask) -> Result<TransferTask, sqlx::Error> {
    let task = TransferTask {
        id: Uuid::new_v4(),
        source: req.source,
        destination: req.destination,
        status: TransferStatus::Created,
        reason: None,
        created_at: chrono::Utc::now(),
        started_at: None,
        finished_at: None,
        runner_id: None,
    };

    sqlx::query(
        r#"
        INSERT INTO transfer_tasks (id, source, destination, status, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(task.id)
    .bind(&task.source)
    .bind(&task.destination)
    .bind(task.status.as_str())
    .bind(task.created_at)
    .execute(pool)
    .await?;

    Ok(task)
}

/// Find a task by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<TransferTask>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransferRow>(
        r#"
        SELECT id, source, destination, status, reason, created_at, started_at, finished_at, runner_id
        FROM transfer_tasks
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// Find tasks by status, oldest first
pub async fn list_by_status(
    pool: &PgPool,
    status: TransferStatus,
) -> Result<Vec<TransferTask>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransferRow>(
        r#"
        SELECT id, source, destination, status, reason, created_at, started_at, finished_at, runner_id
        FROM transfer_tasks
        WHERE status = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// List all tasks, newest first
pub async fn list_all(pool: &PgPool) -> Result<Vec<TransferTask>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransferRow>(
        r#"
        SELECT id, source, destination, status, reason, created_at, started_at, finished_at, runner_id
        FROM transfer_tasks
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Move a `Created` task to `Running` for a runner.
///
/// Returns `false` when the task was already claimed (or does not exist).
pub async fn claim(pool: &PgPool, id: Uuid, runner_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transfer_tasks
        SET status = 'Running', started_at = $1, runner_id = $2
        WHERE id = $3 AND status = 'Created'
        "#,
    )
    .bind(chrono::Utc::now())
    .bind(runner_id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store the final status of a task running on `runner_id`.
///
/// Returns `false` when the task is not running or belongs to another runner.
pub async fn finish(
    pool: &PgPool,
    id: Uuid,
    runner_id: &str,
    status: TransferStatus,
    reason: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transfer_tasks
        SET status = $1, reason = $2, finished_at = $3
        WHERE id = $4 AND status = 'Running' AND runner_id = $5
        "#,
    )
    .bind(status.as_str())
    .bind(reason)
    .bind(chrono::Utc::now())
    .bind(id)
    .bind(runner_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a task by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transfer_tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    source: String,
    destination: String,
    status: String,
    reason: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    runner_id: Option<String>,
}

impl From<TransferRow> for TransferTask {
    fn from(row: TransferRow) -> Self {
        TransferTask {
            id: row.id,
            source: row.source,
            destination: row.destination,
            status: TransferStatus::parse(&row.status).unwrap_or(TransferStatus::Failure),
            reason: row.reason,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            runner_id: row.runner_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    async fn created(pool: &PgPool) -> TransferTask {
        create(
            pool,
            CreateTransferTask {
                source: "/data/in/sample.bam".to_string(),
                destination: "/data/out/sample.bam".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = false)]
    async fn test_only_one_runner_wins_the_claim(pool: PgPool) {
        fixtures::migrated(&pool).await;
        let task = created(&pool).await;

        assert!(claim(&pool, task.id, "dts-1").await.unwrap());
        assert!(!claim(&pool, task.id, "dts-2").await.unwrap());

        let stored = find_by_id(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransferStatus::Running);
        assert_eq!(stored.runner_id.as_deref(), Some("dts-1"));
        assert!(stored.started_at.is_some());
        assert!(list_by_status(&pool, TransferStatus::Created).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = false)]
    async fn test_finish_requires_running_task_of_the_same_runner(pool: PgPool) {
        fixtures::migrated(&pool).await;
        let task = created(&pool).await;

        // Not claimed yet
        assert!(!finish(&pool, task.id, "dts-1", TransferStatus::Success, None).await.unwrap());

        claim(&pool, task.id, "dts-1").await.unwrap();
        assert!(!finish(&pool, task.id, "dts-2", TransferStatus::Success, None).await.unwrap());
        assert!(
            finish(&pool, task.id, "dts-1", TransferStatus::Failure, Some("disk full"))
                .await
                .unwrap()
        );
        // Already final
        assert!(!finish(&pool, task.id, "dts-1", TransferStatus::Success, None).await.unwrap());

        let stored = find_by_id(&pool, task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransferStatus::Failure);
        assert_eq!(stored.reason.as_deref(), Some("disk full"));
        assert!(stored.finished_at.is_some());
    }
}
