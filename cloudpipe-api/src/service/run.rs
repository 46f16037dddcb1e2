//! Run Service
//!
//! Business logic for pipeline run launching and lifecycle. Every status
//! change is written together with a row in the status history so billing
//! can rebuild the periods a run was active.

use chrono::{DateTime, Utc};
use cloudpipe_core::domain::run::{PipelineRun, RunPrices, RunStatus, TaskStatus};
use cloudpipe_core::dto::run::LaunchRun;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{
    offer_repository, pipeline_repository, run_repository, run_status_repository,
};

/// Hours used to spread a monthly storage price over an hour
const HOURS_PER_MONTH: u32 = 730;

/// Prices that do not come from instance offers
#[derive(Debug, Clone, Copy)]
pub struct PricingSettings {
    /// Block storage price per GB and month
    pub storage_gb_month_price: Decimal,
}

/// Service error type
#[derive(Debug)]
pub enum RunError {
    NotFound(Uuid),
    PipelineNotFound(Uuid),
    InvalidState(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Launch a new run priced from the current instance offer
pub async fn launch_run(
    pool: &PgPool,
    pricing: &PricingSettings,
    req: LaunchRun,
) -> Result<PipelineRun> {
    validate_launch_request(&req)?;

    if let Some(pipeline_id) = req.pipeline_id {
        pipeline_repository::find_by_id(pool, pipeline_id)
            .await?
            .ok_or(RunError::PipelineNotFound(pipeline_id))?;
    }

    if let Some(parent_id) = req.parent_run_id {
        run_repository::find_by_id(pool, parent_id)
            .await?
            .ok_or_else(|| {
                RunError::ValidationError(format!("Parent run {} not found", parent_id))
            })?;
    }

    let offer = offer_repository::find(pool, &req.instance.cloud_region, &req.instance.node_type)
        .await?
        .ok_or_else(|| {
            RunError::ValidationError(format!(
                "No offer for instance type {} in region {}",
                req.instance.node_type, req.instance.cloud_region
            ))
        })?;

    let prices = RunPrices {
        compute_price_per_hour: offer.price_per_hour,
        disk_price_per_hour: disk_price_per_hour(
            req.instance.disk_size_gb,
            pricing.storage_gb_month_price,
        ),
    };

    let now = Utc::now();
    let initial = RunStatus {
        status: TaskStatus::Running,
        timestamp: now,
    };
    let run = PipelineRun {
        id: Uuid::new_v4(),
        pipeline_id: req.pipeline_id,
        version: req.version,
        owner: req.owner,
        status: TaskStatus::Running,
        start_date: now,
        end_date: None,
        instance: req.instance,
        prices,
        parameters: req.parameters,
        parent_run_id: req.parent_run_id,
        status_history: vec![initial],
    };

    let mut tx = pool.begin().await?;
    run_repository::create(&mut *tx, &run).await?;
    run_status_repository::insert(&mut *tx, run.id, &initial).await?;
    tx.commit().await?;

    tracing::info!(
        "Run launched: {} on {} in {} ({}/h)",
        run.id,
        run.instance.node_type,
        run.instance.cloud_region,
        run.prices.price_per_hour()
    );

    Ok(run)
}

/// Get a run with its status history
pub async fn get_run(pool: &PgPool, id: Uuid) -> Result<PipelineRun> {
    let mut run = run_repository::find_by_id(pool, id)
        .await?
        .ok_or(RunError::NotFound(id))?;

    run.status_history = run_status_repository::list_for_run(pool, id).await?;

    Ok(run)
}

/// List runs of a pipeline
pub async fn list_runs_by_pipeline(pool: &PgPool, pipeline_id: Uuid) -> Result<Vec<PipelineRun>> {
    pipeline_repository::find_by_id(pool, pipeline_id)
        .await?
        .ok_or(RunError::PipelineNotFound(pipeline_id))?;

    let runs = run_repository::list_by_pipeline(pool, pipeline_id).await?;
    Ok(runs)
}

/// List runs that have not finished yet
pub async fn list_active_runs(pool: &PgPool) -> Result<Vec<PipelineRun>> {
    let runs = run_repository::list_active(pool).await?;
    Ok(runs)
}

/// Runs alive at some point of `[from, to)`, with their status histories
pub async fn list_runs_in_period(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PipelineRun>> {
    if from >= to {
        return Err(RunError::ValidationError(format!(
            "Empty period: {} is not before {}",
            from, to
        )));
    }

    let mut runs = run_repository::list_in_period(pool, from, to).await?;
    let ids: Vec<Uuid> = runs.iter().map(|r| r.id).collect();
    let mut histories = run_status_repository::list_for_runs(pool, &ids).await?;

    for run in &mut runs {
        run.status_history = histories.remove(&run.id).unwrap_or_default();
    }

    Ok(runs)
}

/// Move a run to a new status, recording the change
pub async fn update_status(pool: &PgPool, id: Uuid, status: TaskStatus) -> Result<PipelineRun> {
    apply_transitions(pool, id, &[status]).await
}

/// Stop a running or paused run
pub async fn stop_run(pool: &PgPool, id: Uuid) -> Result<PipelineRun> {
    update_status(pool, id, TaskStatus::Stopped).await
}

/// Pause a running run.
///
/// There is no instance driver behind the server, so the transitional
/// `Pausing` status is immediately followed by `Paused`.
pub async fn pause_run(pool: &PgPool, id: Uuid) -> Result<PipelineRun> {
    apply_transitions(pool, id, &[TaskStatus::Pausing, TaskStatus::Paused]).await
}

/// Resume a paused run (`Resuming` then `Running`)
pub async fn resume_run(pool: &PgPool, id: Uuid) -> Result<PipelineRun> {
    apply_transitions(pool, id, &[TaskStatus::Resuming, TaskStatus::Running]).await
}

/// Walk the run through `steps` in one transaction.
///
/// Each update only applies while the run still has the status it was read
/// with, so a concurrent change makes the whole walk fail with `InvalidState`.
async fn apply_transitions(pool: &PgPool, id: Uuid, steps: &[TaskStatus]) -> Result<PipelineRun> {
    let run = run_repository::find_by_id(pool, id)
        .await?
        .ok_or(RunError::NotFound(id))?;

    let mut current = run.status;
    let mut tx = pool.begin().await?;

    for &next in steps {
        validate_transition(id, current, next)?;

        let now = Utc::now();
        let end_date = next.is_final().then_some(now);
        let applied = run_repository::update_status(&mut *tx, id, current, next, end_date).await?;
        if !applied {
            return Err(RunError::InvalidState(format!(
                "Run {} changed status concurrently, it is no longer {}",
                id, current
            )));
        }

        run_status_repository::insert(
            &mut *tx,
            id,
            &RunStatus {
                status: next,
                timestamp: now,
            },
        )
        .await?;
        current = next;
    }

    tx.commit().await?;

    tracing::info!("Run {} moved from {} to {}", id, run.status, current);

    get_run(pool, id).await
}

/// Delete a finished run
pub async fn delete_run(pool: &PgPool, id: Uuid) -> Result<()> {
    let run = run_repository::find_by_id(pool, id)
        .await?
        .ok_or(RunError::NotFound(id))?;

    if !run.status.is_final() {
        return Err(RunError::InvalidState(format!(
            "Cannot delete run {} in status {}",
            id, run.status
        )));
    }

    run_repository::delete(pool, id).await?;
    tracing::info!("Run deleted: {}", id);

    Ok(())
}

// =============================================================================
// Pricing
// =============================================================================

/// Hourly price of a run's disk, rounded to six decimals
pub fn disk_price_per_hour(disk_size_gb: i32, storage_gb_month_price: Decimal) -> Decimal {
    (Decimal::from(disk_size_gb) * storage_gb_month_price / Decimal::from(HOURS_PER_MONTH))
        .round_dp(6)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_launch_request(req: &LaunchRun) -> Result<()> {
    if req.owner.trim().is_empty() {
        return Err(RunError::ValidationError(
            "Run owner cannot be empty".to_string(),
        ));
    }

    if req.instance.node_type.trim().is_empty() || req.instance.cloud_region.trim().is_empty() {
        return Err(RunError::ValidationError(
            "Instance type and cloud region are required".to_string(),
        ));
    }

    if req.instance.disk_size_gb <= 0 {
        return Err(RunError::ValidationError(format!(
            "Disk size must be positive, got {}",
            req.instance.disk_size_gb
        )));
    }

    Ok(())
}

fn validate_transition(id: Uuid, current: TaskStatus, next: TaskStatus) -> Result<()> {
    if !current.can_transition_to(next) {
        return Err(RunError::InvalidState(format!(
            "Run {} cannot move from {} to {}",
            id, current, next
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpipe_core::domain::run::RunInstance;
    use std::collections::HashMap;

    fn launch(owner: &str, disk_size_gb: i32) -> LaunchRun {
        LaunchRun {
            pipeline_id: None,
            version: None,
            owner: owner.to_string(),
            instance: RunInstance {
                node_type: "m5.large".to_string(),
                cloud_region: "us-east-1".to_string(),
                disk_size_gb,
                spot: false,
            },
            parameters: HashMap::new(),
            parent_run_id: None,
        }
    }

    #[test]
    fn test_disk_price_per_hour() {
        // 100 GB at 0.10 per GB-month = 10 per month
        assert_eq!(
            disk_price_per_hour(100, Decimal::new(10, 2)),
            Decimal::new(13699, 6)
        );
        assert_eq!(disk_price_per_hour(730, Decimal::ONE), Decimal::ONE);
    }

    #[test]
    fn test_validate_launch_request() {
        assert!(validate_launch_request(&launch("alice", 50)).is_ok());
        assert!(matches!(
            validate_launch_request(&launch(" ", 50)),
            Err(RunError::ValidationError(_))
        ));
        assert!(matches!(
            validate_launch_request(&launch("alice", 0)),
            Err(RunError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_transition() {
        let id = Uuid::new_v4();
        assert!(validate_transition(id, TaskStatus::Running, TaskStatus::Pausing).is_ok());
        assert!(matches!(
            validate_transition(id, TaskStatus::Stopped, TaskStatus::Running),
            Err(RunError::InvalidState(_))
        ));
        assert!(matches!(
            validate_transition(id, TaskStatus::Paused, TaskStatus::Pausing),
            Err(RunError::InvalidState(_))
        ));
    }

    fn pricing() -> PricingSettings {
        PricingSettings {
            storage_gb_month_price: Decimal::new(10, 2),
        }
    }

    #[sqlx::test(migrations = false)]
    async fn test_pause_run_records_both_steps(pool: PgPool) {
        crate::repository::fixtures::migrated(&pool).await;
        crate::repository::fixtures::seed_offer(&pool).await;

        let run = launch_run(&pool, &pricing(), launch("alice", 50)).await.unwrap();
        let paused = pause_run(&pool, run.id).await.unwrap();

        let history: Vec<_> = paused.status_history.iter().map(|s| s.status).collect();
        assert_eq!(paused.status, TaskStatus::Paused);
        assert_eq!(
            history,
            vec![TaskStatus::Running, TaskStatus::Pausing, TaskStatus::Paused]
        );

        let stopped = stop_run(&pool, run.id).await.unwrap();
        assert!(stopped.end_date.is_some());
        assert!(matches!(
            resume_run(&pool, run.id).await,
            Err(RunError::InvalidState(_))
        ));
    }

    #[sqlx::test(migrations = false)]
    async fn test_concurrent_stop_and_pause_keep_final_status(pool: PgPool) {
        crate::repository::fixtures::migrated(&pool).await;
        crate::repository::fixtures::seed_offer(&pool).await;

        for _ in 0..25 {
            let run = launch_run(&pool, &pricing(), launch("alice", 50)).await.unwrap();

            let (stop, pause) = tokio::join!(stop_run(&pool, run.id), pause_run(&pool, run.id));
            let run = get_run(&pool, run.id).await.unwrap();
            let last = run.status_history.last().map(|s| s.status);

            assert!(stop.is_ok() || pause.is_ok());
            assert_eq!(last, Some(run.status));
            assert!(!matches!(run.status, TaskStatus::Pausing));
            if stop.is_ok() {
                assert_eq!(run.status, TaskStatus::Stopped);
                assert!(run.end_date.is_some());
            } else {
                assert_eq!(run.status, TaskStatus::Paused);
                assert!(run.end_date.is_none());
                assert!(matches!(stop, Err(RunError::InvalidState(_))));
            }
        }
    }
}
