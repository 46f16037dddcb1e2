//! Activity periods of a run

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::run::{PipelineRun, RunStatus};

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActivityPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Intersection with `[from, to)`, `None` if empty
    pub fn clip(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<ActivityPeriod> {
        let start = self.start.max(from);
        let end = self.end.min(to);
        (start < end).then_some(ActivityPeriod { start, end })
    }
}

/// Periods in which the run's compute instance was up, clipped to the window.
///
/// A period opens at `start_date` or at a change into a billable status and
/// closes at the next change into a non-billable one. A period left open
/// closes at `end_date`, or at `window_end` while the run is still alive.
pub fn activity_periods(
    run: &PipelineRun,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<ActivityPeriod> {
    let mut history: Vec<RunStatus> = run
        .status_history
        .iter()
        .filter(|change| change.timestamp >= run.start_date)
        .copied()
        .collect();
    history.sort_by_key(|change| change.timestamp);

    let mut periods = Vec::new();
    let mut open = Some(run.start_date);

    for change in &history {
        match (open, change.status.is_billable_compute()) {
            (Some(start), false) => {
                periods.push(ActivityPeriod::new(start, change.timestamp));
                open = None;
            }
            (None, true) => open = Some(change.timestamp),
            _ => {}
        }
    }

    if let Some(start) = open {
        periods.push(ActivityPeriod::new(start, run.end_date.unwrap_or(window_end)));
    }

    periods
        .into_iter()
        .filter_map(|period| period.clip(window_start, window_end))
        .collect()
}

/// The run's whole lifetime (paused time included), clipped to the window
pub fn lifetime_period(
    run: &PipelineRun,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Option<ActivityPeriod> {
    ActivityPeriod::new(run.start_date, run.end_date.unwrap_or(window_end))
        .clip(window_start, window_end)
}

/// Splits periods at UTC midnight and sums the time spent on each day
pub fn split_by_day(periods: &[ActivityPeriod]) -> BTreeMap<NaiveDate, Duration> {
    let mut days: BTreeMap<NaiveDate, Duration> = BTreeMap::new();

    for period in periods {
        let mut cursor = period.start;
        while cursor < period.end {
            let day = cursor.date_naive();
            let segment_end = match day.succ_opt() {
                Some(next) => day_start(next).min(period.end),
                None => period.end,
            };
            *days.entry(day).or_insert_with(Duration::zero) += segment_end - cursor;
            cursor = segment_end;
        }
    }

    days
}

/// Midnight UTC of the given day
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{RunInstance, RunPrices, TaskStatus};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn run(start: DateTime<Utc>, end: Option<DateTime<Utc>>, history: Vec<RunStatus>) -> PipelineRun {
        PipelineRun {
            id: Uuid::new_v4(),
            pipeline_id: None,
            version: None,
            owner: "alice".to_string(),
            status: TaskStatus::Running,
            start_date: start,
            end_date: end,
            instance: RunInstance {
                node_type: "m5.large".to_string(),
                cloud_region: "us-east-1".to_string(),
                disk_size_gb: 50,
                spot: false,
            },
            prices: RunPrices::default(),
            parameters: Default::default(),
            parent_run_id: None,
            status_history: history,
        }
    }

    fn change(status: TaskStatus, timestamp: DateTime<Utc>) -> RunStatus {
        RunStatus { status, timestamp }
    }

    #[test]
    fn test_run_without_history_is_active_until_end() {
        let run = run(at(1, 10, 0), Some(at(1, 12, 0)), vec![]);
        let periods = activity_periods(&run, at(1, 0, 0), at(2, 0, 0));
        assert_eq!(periods, vec![ActivityPeriod::new(at(1, 10, 0), at(1, 12, 0))]);
    }

    #[test]
    fn test_paused_time_is_excluded() {
        let run = run(
            at(1, 8, 0),
            Some(at(1, 18, 0)),
            vec![
                change(TaskStatus::Running, at(1, 8, 0)),
                change(TaskStatus::Pausing, at(1, 10, 0)),
                change(TaskStatus::Paused, at(1, 10, 5)),
                change(TaskStatus::Resuming, at(1, 14, 0)),
                change(TaskStatus::Running, at(1, 14, 3)),
                change(TaskStatus::Stopped, at(1, 18, 0)),
            ],
        );

        let periods = activity_periods(&run, at(1, 0, 0), at(2, 0, 0));
        assert_eq!(
            periods,
            vec![
                ActivityPeriod::new(at(1, 8, 0), at(1, 10, 5)),
                ActivityPeriod::new(at(1, 14, 0), at(1, 18, 0)),
            ]
        );
    }

    #[test]
    fn test_history_order_does_not_matter() {
        let run = run(
            at(1, 8, 0),
            Some(at(1, 12, 0)),
            vec![
                change(TaskStatus::Success, at(1, 12, 0)),
                change(TaskStatus::Running, at(1, 8, 0)),
            ],
        );
        let periods = activity_periods(&run, at(1, 0, 0), at(2, 0, 0));
        assert_eq!(periods, vec![ActivityPeriod::new(at(1, 8, 0), at(1, 12, 0))]);
    }

    #[test]
    fn test_unfinished_run_is_clipped_to_window() {
        let run = run(at(1, 20, 0), None, vec![change(TaskStatus::Running, at(1, 20, 0))]);
        let periods = activity_periods(&run, at(2, 0, 0), at(3, 0, 0));
        assert_eq!(periods, vec![ActivityPeriod::new(at(2, 0, 0), at(3, 0, 0))]);
    }

    #[test]
    fn test_run_outside_window_has_no_periods() {
        let run = run(at(1, 8, 0), Some(at(1, 9, 0)), vec![]);
        assert!(activity_periods(&run, at(2, 0, 0), at(3, 0, 0)).is_empty());
    }

    #[test]
    fn test_lifetime_includes_paused_time() {
        let run = run(
            at(1, 8, 0),
            Some(at(1, 18, 0)),
            vec![change(TaskStatus::Paused, at(1, 10, 0))],
        );
        assert_eq!(
            lifetime_period(&run, at(1, 0, 0), at(2, 0, 0)),
            Some(ActivityPeriod::new(at(1, 8, 0), at(1, 18, 0)))
        );
    }

    #[test]
    fn test_split_by_day_crosses_midnight() {
        let periods = vec![
            ActivityPeriod::new(at(1, 22, 0), at(3, 1, 30)),
            ActivityPeriod::new(at(3, 10, 0), at(3, 10, 45)),
        ];
        let days = split_by_day(&periods);

        assert_eq!(days.len(), 3);
        assert_eq!(days[&at(1, 0, 0).date_naive()], Duration::hours(2));
        assert_eq!(days[&at(2, 0, 0).date_naive()], Duration::hours(24));
        assert_eq!(days[&at(3, 0, 0).date_naive()], Duration::minutes(135));
    }
}
