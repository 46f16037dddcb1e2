//! Run Schedule Repository

use cloudpipe_core::domain::schedule::{RunSchedule, ScheduleAction, ScheduleTarget};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new schedule
pub async fn create(pool: &PgPool, schedule: &RunSchedule) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO run_schedules (
            id, target_type, target_id, action, cron_expression, time_zone, created_at, last_fired_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(schedule.id)
    .bind(schedule.target.kind_str())
    .bind(schedule.target.id())
    .bind(schedule.action.as_str())
    .bind(&schedule.cron_expression)
    .bind(&schedule.time_zone)
    .bind(schedule.created_at)
    .bind(schedule.last_fired_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a schedule by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RunSchedule>, sqlx::Error> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, target_type, target_id, action, cron_expression, time_zone, created_at, last_fired_at
        FROM run_schedules
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(ScheduleRow::into_schedule))
}

/// Schedules attached to a run or a pipeline
pub async fn list_for_target(
    pool: &PgPool,
    target: ScheduleTarget,
) -> Result<Vec<RunSchedule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, target_type, target_id, action, cron_expression, time_zone, created_at, last_fired_at
        FROM run_schedules
        WHERE target_type = $1 AND target_id = $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(target.kind_str())
    .bind(target.id())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(ScheduleRow::into_schedule).collect())
}

/// List all schedules
pub async fn list_all(pool: &PgPool) -> Result<Vec<RunSchedule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT id, target_type, target_id, action, cron_expression, time_zone, created_at, last_fired_at
        FROM run_schedules
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(ScheduleRow::into_schedule).collect())
}

/// Remember when a schedule last fired
pub async fn mark_fired(
    pool: &PgPool,
    id: Uuid,
    fired_at: chrono::DateTime<chrono::Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE run_schedules SET last_fired_at = $1 WHERE id = $2")
        .bind(fired_at)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a schedule by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM run_schedules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    target_type: String,
    target_id: Uuid,
    action: String,
    cron_expression: String,
    time_zone: String,
    created_at: chrono::DateTime<chrono::Utc>,
    last_fired_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ScheduleRow {
    fn into_schedule(self) -> Option<RunSchedule> {
        let target = match self.target_type.as_str() {
            "Run" => ScheduleTarget::Run(self.target_id),
            "Pipeline" => ScheduleTarget::Pipeline(self.target_id),
            other => {
                tracing::warn!("Skipping schedule {} with unknown target '{}'", self.id, other);
                return None;
            }
        };
        let Some(action) = ScheduleAction::parse(&self.action) else {
            tracing::warn!("Skipping schedule {} with unknown action '{}'", self.id, self.action);
            return None;
        };

        Some(RunSchedule {
            id: self.id,
            target,
            action,
            cron_expression: self.cron_expression,
            time_zone: self.time_zone,
            created_at: self.created_at,
            last_fired_at: self.last_fired_at,
        })
    }
}
