use chrono::{DateTime, Duration, NaiveDate, Utc};
use cloudpipe_core::billing::{
    ActivityPeriod, RunBillingDoc, activity_periods, cost_for, lifetime_period, split_by_day,
};
use cloudpipe_core::domain::run::PipelineRun;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::error::{BillingError, Result};

/// Bills pipeline runs per UTC day.
///
/// Compute is charged for the time the instance was up, disk for the whole
/// lifetime of the run (the volume stays allocated while paused).
pub struct RunBillingConverter;

impl RunBillingConverter {
    /// Billing documents of one run for the days of `[window_start, window_end)`
    pub fn convert(
        run: &PipelineRun,
        pipeline_name: Option<&str>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RunBillingDoc>> {
        if let Some(end) = run.end_date {
            if end < run.start_date {
                return Err(BillingError::InvalidRecord(format!(
                    "run {} ends at {} before it starts at {}",
                    run.id, end, run.start_date
                )));
            }
        }

        let compute = split_by_day(&activity_periods(run, window_start, window_end));
        let disk_periods: Vec<ActivityPeriod> =
            lifetime_period(run, window_start, window_end).into_iter().collect();
        let disk = split_by_day(&disk_periods);

        let days: BTreeSet<NaiveDate> = compute.keys().chain(disk.keys()).copied().collect();

        let docs = days
            .into_iter()
            .map(|date| {
                let compute_time = time_on(&compute, date);
                let disk_time = time_on(&disk, date);
                let compute_cost = cost_for(compute_time, run.prices.compute_price_per_hour);
                let disk_cost = cost_for(disk_time, run.prices.disk_price_per_hour);

                RunBillingDoc {
                    doc_id: RunBillingDoc::doc_id_for(run.id, date),
                    run_id: run.id,
                    pipeline_id: run.pipeline_id,
                    pipeline_name: pipeline_name.map(str::to_string),
                    owner: run.owner.clone(),
                    instance_type: run.instance.node_type.clone(),
                    cloud_region: run.instance.cloud_region.clone(),
                    spot: run.instance.spot,
                    date,
                    usage_minutes: compute_time.num_minutes(),
                    compute_cost,
                    disk_cost,
                    cost: compute_cost + disk_cost,
                }
            })
            .collect();

        Ok(docs)
    }

    /// Converts every run, logging and skipping the ones that cannot be billed
    pub fn convert_all(
        runs: &[PipelineRun],
        pipeline_names: &HashMap<Uuid, String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<RunBillingDoc> {
        let mut docs = Vec::new();

        for run in runs {
            let name = run
                .pipeline_id
                .and_then(|id| pipeline_names.get(&id))
                .map(String::as_str);

            match Self::convert(run, name, window_start, window_end) {
                Ok(run_docs) => docs.extend(run_docs),
                Err(e) => tracing::warn!("Skipping run {}: {}", run.id, e),
            }
        }

        docs
    }
}

fn time_on(days: &BTreeMap<NaiveDate, Duration>, date: NaiveDate) -> Duration {
    days.get(&date).copied().unwrap_or_else(Duration::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cloudpipe_core::domain::run::{RunInstance, RunPrices, RunStatus, TaskStatus};
    use rust_decimal::Decimal;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn run(start: DateTime<Utc>, end: Option<DateTime<Utc>>, history: Vec<RunStatus>) -> PipelineRun {
        PipelineRun {
            id: Uuid::new_v4(),
            pipeline_id: Some(Uuid::new_v4()),
            version: Some("main".to_string()),
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
            prices: RunPrices {
                compute_price_per_hour: Decimal::ONE,
                disk_price_per_hour: Decimal::new(1, 1),
            },
            parameters: HashMap::new(),
            parent_run_id: None,
            status_history: history,
        }
    }

    fn change(status: TaskStatus, timestamp: DateTime<Utc>) -> RunStatus {
        RunStatus { status, timestamp }
    }

    #[test]
    fn test_run_within_one_day() {
        let run = run(at(1, 10, 0), Some(at(1, 12, 0)), vec![]);
        let docs =
            RunBillingConverter::convert(&run, Some("rnaseq"), at(1, 0, 0), at(2, 0, 0)).unwrap();

        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.date, date(1));
        assert_eq!(doc.pipeline_name.as_deref(), Some("rnaseq"));
        assert_eq!(doc.usage_minutes, 120);
        assert_eq!(doc.compute_cost, 20_000);
        assert_eq!(doc.disk_cost, 2_000);
        assert_eq!(doc.cost, 22_000);
        assert_eq!(doc.doc_id, RunBillingDoc::doc_id_for(run.id, date(1)));
    }

    #[test]
    fn test_run_across_midnight_is_split() {
        let run = run(at(1, 23, 0), Some(at(2, 1, 30)), vec![]);
        let docs = RunBillingConverter::convert(&run, None, at(1, 0, 0), at(3, 0, 0)).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].usage_minutes, 60);
        assert_eq!(docs[1].usage_minutes, 90);
    }

    #[test]
    fn test_paused_time_bills_disk_only() {
        let run = run(
            at(1, 8, 0),
            Some(at(1, 12, 0)),
            vec![
                change(TaskStatus::Running, at(1, 8, 0)),
                change(TaskStatus::Paused, at(1, 9, 0)),
                change(TaskStatus::Resuming, at(1, 11, 0)),
                change(TaskStatus::Stopped, at(1, 12, 0)),
            ],
        );
        let docs = RunBillingConverter::convert(&run, None, at(1, 0, 0), at(2, 0, 0)).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].usage_minutes, 120);
        assert_eq!(docs[0].compute_cost, 20_000);
        // 4 hours of disk at 0.1 per hour
        assert_eq!(docs[0].disk_cost, 4_000);
    }

    #[test]
    fn test_day_with_only_paused_time_has_a_doc() {
        let run = run(
            at(1, 22, 0),
            None,
            vec![change(TaskStatus::Paused, at(1, 23, 0))],
        );
        let docs = RunBillingConverter::convert(&run, None, at(2, 0, 0), at(3, 0, 0)).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].date, date(2));
        assert_eq!(docs[0].usage_minutes, 0);
        assert_eq!(docs[0].compute_cost, 0);
        assert_eq!(docs[0].disk_cost, 24_000);
    }

    #[test]
    fn test_run_outside_window_has_no_docs() {
        let run = run(at(1, 10, 0), Some(at(1, 12, 0)), vec![]);
        let docs = RunBillingConverter::convert(&run, None, at(2, 0, 0), at(3, 0, 0)).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let run = run(at(1, 12, 0), Some(at(1, 10, 0)), vec![]);
        assert!(matches!(
            RunBillingConverter::convert(&run, None, at(1, 0, 0), at(2, 0, 0)),
            Err(BillingError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_convert_all_skips_invalid_runs() {
        let good = run(at(1, 10, 0), Some(at(1, 11, 0)), vec![]);
        let bad = run(at(1, 12, 0), Some(at(1, 10, 0)), vec![]);
        let mut names = HashMap::new();
        if let Some(id) = good.pipeline_id {
            names.insert(id, "variant-calling".to_string());
        }

        let docs = RunBillingConverter::convert_all(&[good, bad], &names, at(1, 0, 0), at(2, 0, 0));

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pipeline_name.as_deref(), Some("variant-calling"));
    }
}
