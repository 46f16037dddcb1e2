//! Schedule dispatcher
//!
//! Background loop that fires due run schedules. Pause and Resume act on the
//! scheduled run; Run launches the pipeline again with the settings of its
//! latest run.

use chrono::Utc;
use cloudpipe_core::domain::schedule::{RunSchedule, ScheduleAction, ScheduleTarget};
use cloudpipe_core::dto::run::LaunchRun;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::AppState;
use crate::repository::run_repository;
use crate::service::{run_service, schedule_service};

pub struct ScheduleDispatcher {
    state: AppState,
    interval: Duration,
}

/// What a firing did
#[derive(Debug, PartialEq, Eq)]
enum Firing {
    Applied,
    Skipped,
}

impl ScheduleDispatcher {
    pub fn new(state: AppState, interval: Duration) -> Self {
        Self { state, interval }
    }

    /// Runs forever, checking schedules every `interval`
    pub async fn run(&self) {
        info!("Starting schedule dispatcher (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.dispatch_due().await {
                Ok(0) => debug!("No schedules due"),
                Ok(fired) => info!("Fired {} schedule(s) this cycle", fired),
                Err(e) => error!("Error during schedule cycle: {:?}", e),
            }
        }
    }

    /// Fires every due schedule once
    async fn dispatch_due(&self) -> Result<usize, schedule_service::ScheduleError> {
        let now = Utc::now();
        let due = schedule_service::due_schedules(&self.state.pool, now).await?;

        let mut fired = 0;
        for schedule in due {
            match self.fire(&schedule).await {
                Ok(Firing::Applied) => fired += 1,
                Ok(Firing::Skipped) => {}
                Err(e) => warn!(
                    "Schedule {} ({} {} {}) failed: {}",
                    schedule.id,
                    schedule.action,
                    schedule.target.kind_str(),
                    schedule.target.id(),
                    e
                ),
            }

            // Failed and skipped firings are recorded too, otherwise they retry every cycle
            if let Err(e) = schedule_service::mark_fired(&self.state.pool, schedule.id, now).await {
                error!("Failed to record firing of schedule {}: {:?}", schedule.id, e);
            }
        }

        Ok(fired)
    }

    async fn fire(&self, schedule: &RunSchedule) -> Result<Firing, String> {
        let pool = &self.state.pool;

        match (schedule.action, schedule.target) {
            (ScheduleAction::Pause, ScheduleTarget::Run(run_id)) => {
                run_service::pause_run(pool, run_id)
                    .await
                    .map_err(|e| format!("{:?}", e))?;
                info!("Schedule {} paused run {}", schedule.id, run_id);
                Ok(Firing::Applied)
            }
            (ScheduleAction::Resume, ScheduleTarget::Run(run_id)) => {
                run_service::resume_run(pool, run_id)
                    .await
                    .map_err(|e| format!("{:?}", e))?;
                info!("Schedule {} resumed run {}", schedule.id, run_id);
                Ok(Firing::Applied)
            }
            (ScheduleAction::Run, ScheduleTarget::Pipeline(pipeline_id)) => {
                let latest = run_repository::latest_for_pipeline(pool, pipeline_id)
                    .await
                    .map_err(|e| format!("{:?}", e))?;

                let Some(latest) = latest else {
                    warn!(
                        "Schedule {}: pipeline {} has never run, nothing to repeat",
                        schedule.id, pipeline_id
                    );
                    return Ok(Firing::Skipped);
                };

                let run = run_service::launch_run(
                    pool,
                    &self.state.pricing,
                    LaunchRun::repeat_of(&latest),
                )
                .await
                .map_err(|e| format!("{:?}", e))?;
                info!(
                    "Schedule {} launched run {} of pipeline {}",
                    schedule.id, run.id, pipeline_id
                );
                Ok(Firing::Applied)
            }
            (action, target) => {
                warn!(
                    "Schedule {}: action {} does not apply to a {}",
                    schedule.id,
                    action,
                    target.kind_str()
                );
                Ok(Firing::Skipped)
            }
        }
    }
}
