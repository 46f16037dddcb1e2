//! Schedule Service
//!
//! Business logic for cron-triggered run actions. Expressions use the
//! five-field cron syntax and are evaluated in the schedule's time zone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cloudpipe_core::domain::schedule::{RunSchedule, ScheduleTarget};
use cloudpipe_core::dto::schedule::{CreateSchedule, ScheduleInfo};
use croner::Cron;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{pipeline_repository, run_repository, schedule_repository};

/// Service error type
#[derive(Debug)]
pub enum ScheduleError {
    NotFound(Uuid),
    TargetNotFound(ScheduleTarget),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for ScheduleError {
    fn from(err: sqlx::Error) -> Self {
        ScheduleError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Create a schedule for an existing run or pipeline
pub async fn create_schedule(pool: &PgPool, req: CreateSchedule) -> Result<ScheduleInfo> {
    validate_schedule_request(&req)?;

    let exists = match req.target {
        ScheduleTarget::Run(id) => run_repository::find_by_id(pool, id).await?.is_some(),
        ScheduleTarget::Pipeline(id) => {
            pipeline_repository::find_by_id(pool, id).await?.is_some()
        }
    };
    if !exists {
        return Err(ScheduleError::TargetNotFound(req.target));
    }

    let schedule = RunSchedule {
        id: Uuid::new_v4(),
        target: req.target,
        action: req.action,
        cron_expression: req.cron_expression.trim().to_string(),
        time_zone: req.time_zone,
        created_at: Utc::now(),
        last_fired_at: None,
    };

    schedule_repository::create(pool, &schedule).await?;

    tracing::info!(
        "Schedule created: {} ({} {} {} '{}' {})",
        schedule.id,
        schedule.action,
        schedule.target.kind_str(),
        schedule.target.id(),
        schedule.cron_expression,
        schedule.time_zone
    );

    Ok(with_next_fire(schedule))
}

/// Get a schedule by ID
pub async fn get_schedule(pool: &PgPool, id: Uuid) -> Result<ScheduleInfo> {
    let schedule = schedule_repository::find_by_id(pool, id)
        .await?
        .ok_or(ScheduleError::NotFound(id))?;

    Ok(with_next_fire(schedule))
}

/// List all schedules
pub async fn list_schedules(pool: &PgPool) -> Result<Vec<ScheduleInfo>> {
    let schedules = schedule_repository::list_all(pool).await?;
    Ok(schedules.into_iter().map(with_next_fire).collect())
}

/// List the schedules of one run or pipeline
pub async fn list_for_target(pool: &PgPool, target: ScheduleTarget) -> Result<Vec<ScheduleInfo>> {
    let schedules = schedule_repository::list_for_target(pool, target).await?;
    Ok(schedules.into_iter().map(with_next_fire).collect())
}

/// Delete a schedule
pub async fn delete_schedule(pool: &PgPool, id: Uuid) -> Result<()> {
    let deleted = schedule_repository::delete(pool, id).await?;
    if !deleted {
        return Err(ScheduleError::NotFound(id));
    }

    tracing::info!("Schedule deleted: {}", id);

    Ok(())
}

/// Schedules whose next occurrence is not later than `now`
pub async fn due_schedules(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<RunSchedule>> {
    let schedules = schedule_repository::list_all(pool).await?;

    Ok(schedules
        .into_iter()
        .filter(|schedule| match is_due(schedule, now) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!("Skipping schedule {}: {:?}", schedule.id, e);
                false
            }
        })
        .collect())
}

/// Record a firing
pub async fn mark_fired(pool: &PgPool, id: Uuid, fired_at: DateTime<Utc>) -> Result<()> {
    let updated = schedule_repository::mark_fired(pool, id, fired_at).await?;
    if !updated {
        return Err(ScheduleError::NotFound(id));
    }
    Ok(())
}

// =============================================================================
// Cron Evaluation
// =============================================================================

/// First occurrence strictly after `after`
pub fn next_fire_at(schedule: &RunSchedule, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let cron = parse_cron(&schedule.cron_expression)?;
    let tz = parse_time_zone(&schedule.time_zone)?;

    let next = cron
        .find_next_occurrence(&after.with_timezone(&tz), false)
        .map_err(|e| {
            ScheduleError::ValidationError(format!(
                "No next occurrence for '{}': {}",
                schedule.cron_expression, e
            ))
        })?;

    Ok(next.with_timezone(&Utc))
}

/// A schedule is due once the first occurrence after its last firing
/// (or its creation) has passed
pub fn is_due(schedule: &RunSchedule, now: DateTime<Utc>) -> Result<bool> {
    let reference = schedule
        .last_fired_at
        .map_or(schedule.created_at, |fired| fired.max(schedule.created_at));

    Ok(next_fire_at(schedule, reference)? <= now)
}

fn with_next_fire(schedule: RunSchedule) -> ScheduleInfo {
    let next_fire_at = next_fire_at(&schedule, Utc::now()).ok();
    ScheduleInfo {
        schedule,
        next_fire_at,
    }
}

fn parse_cron(expression: &str) -> Result<Cron> {
    Cron::new(expression.trim()).parse().map_err(|e| {
        ScheduleError::ValidationError(format!("Invalid cron expression '{}': {}", expression, e))
    })
}

fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ScheduleError::ValidationError(format!("Unknown time zone: {}", name)))
}

// =============================================================================
// Validation
// =============================================================================

fn validate_schedule_request(req: &CreateSchedule) -> Result<()> {
    if !req.action.applies_to(&req.target) {
        return Err(ScheduleError::ValidationError(format!(
            "Action {} cannot target a {}",
            req.action,
            req.target.kind_str()
        )));
    }

    if req.cron_expression.split_whitespace().count() != 5 {
        return Err(ScheduleError::ValidationError(format!(
            "Cron expression must have five fields: '{}'",
            req.cron_expression
        )));
    }

    parse_cron(&req.cron_expression)?;
    parse_time_zone(&req.time_zone)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cloudpipe_core::domain::schedule::ScheduleAction;

    fn request(action: ScheduleAction, target: ScheduleTarget, cron: &str, tz: &str) -> CreateSchedule {
        CreateSchedule {
            target,
            action,
            cron_expression: cron.to_string(),
            time_zone: tz.to_string(),
        }
    }

    fn schedule(cron: &str, tz: &str, created_at: DateTime<Utc>) -> RunSchedule {
        RunSchedule {
            id: Uuid::new_v4(),
            target: ScheduleTarget::Run(Uuid::new_v4()),
            action: ScheduleAction::Pause,
            cron_expression: cron.to_string(),
            time_zone: tz.to_string(),
            created_at,
            last_fired_at: None,
        }
    }

    #[test]
    fn test_validate_schedule_request() {
        let run = ScheduleTarget::Run(Uuid::new_v4());
        let pipeline = ScheduleTarget::Pipeline(Uuid::new_v4());

        assert!(validate_schedule_request(&request(ScheduleAction::Pause, run, "0 20 * * 1-5", "UTC")).is_ok());
        assert!(validate_schedule_request(&request(ScheduleAction::Run, pipeline, "30 6 * * *", "Europe/Berlin")).is_ok());

        // Action does not fit the target
        assert!(validate_schedule_request(&request(ScheduleAction::Run, run, "0 20 * * *", "UTC")).is_err());
        // Six fields
        assert!(validate_schedule_request(&request(ScheduleAction::Pause, run, "0 0 20 * * *", "UTC")).is_err());
        // Bad field value
        assert!(validate_schedule_request(&request(ScheduleAction::Pause, run, "61 20 * * *", "UTC")).is_err());
        // Unknown zone
        assert!(validate_schedule_request(&request(ScheduleAction::Pause, run, "0 20 * * *", "Mars/Olympus")).is_err());
    }

    #[test]
    fn test_next_fire_at_respects_time_zone() {
        let created = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let s = schedule("0 20 * * *", "Europe/Berlin", created);

        // 20:00 in Berlin (CET, UTC+1) is 19:00 UTC
        let next = next_fire_at(&s, created).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 15, 19, 0, 0).unwrap());
    }

    #[test]
    fn test_is_due_uses_last_firing() {
        let created = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut s = schedule("0 20 * * *", "UTC", created);

        assert!(!is_due(&s, Utc.with_ymd_and_hms(2024, 1, 15, 19, 59, 0).unwrap()).unwrap());
        assert!(is_due(&s, Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap()).unwrap());

        s.last_fired_at = Some(Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 30).unwrap());
        assert!(!is_due(&s, Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap()).unwrap());
        assert!(is_due(&s, Utc.with_ymd_and_hms(2024, 1, 16, 20, 0, 0).unwrap()).unwrap());
    }
}
