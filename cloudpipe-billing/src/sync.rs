//! Billing synchronization loop
//!
//! Each cycle bills every whole UTC day that ended since the last synced day.
//! A day is only marked synced once all of its documents were indexed, so a
//! failed day is retried on the next cycle.

use chrono::{Days, NaiveDate, Utc};
use cloudpipe_client::ApiClient;
use cloudpipe_core::billing::period::day_start;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::converter::{RunBillingConverter, StorageBillingConverter};
use crate::elastic::{BulkReport, ElasticWriter};
use crate::error::{BillingError, Result};
use crate::pricing::{PriceCache, PriceTable};

pub struct BillingSync {
    client: Arc<ApiClient>,
    writer: ElasticWriter,
    prices: PriceCache,
    /// Push instance offers to the API after each price refresh
    push_offers: bool,
    interval: Duration,
    start_date: Option<NaiveDate>,
    /// Last day whose documents were all indexed
    last_synced: Option<NaiveDate>,
}

impl BillingSync {
    pub fn new(
        client: Arc<ApiClient>,
        writer: ElasticWriter,
        prices: PriceCache,
        push_offers: bool,
        interval: Duration,
        start_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            client,
            writer,
            prices,
            push_offers,
            interval,
            start_date,
            last_synced: None,
        }
    }

    pub fn last_synced(&self) -> Option<NaiveDate> {
        self.last_synced
    }

    /// Runs sync cycles forever with a fixed delay between them
    pub async fn run(mut self) {
        info!("Starting billing sync (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let today = Utc::now().date_naive();
            match self.sync_once(today).await {
                Ok(0) => debug!("Billing is up to date"),
                Ok(days) => info!("Billed {} day(s)", days),
                Err(e) => error!("Billing sync failed: {}", e),
            }
        }
    }

    /// Bills the pending days before `today`, returning how many were completed
    pub async fn sync_once(&mut self, today: NaiveDate) -> Result<usize> {
        let cached = self.prices.get().await?;
        if cached.fresh && self.push_offers {
            self.push_offers(&cached.table).await;
        }

        let days = days_to_sync(self.last_synced, self.start_date, today);
        let mut completed = 0;

        for day in days {
            self.sync_day(day, &cached.table).await?;
            self.last_synced = Some(day);
            completed += 1;
        }

        Ok(completed)
    }

    async fn sync_day(&self, day: NaiveDate, prices: &PriceTable) -> Result<()> {
        let window_start = day_start(day);
        let window_end = window_start + chrono::Duration::days(1);
        info!("Billing {}", day);

        let runs = self.client.list_runs_in_period(window_start, window_end).await?;
        let pipeline_names: HashMap<Uuid, String> = if runs.is_empty() {
            HashMap::new()
        } else {
            self.client
                .list_pipelines()
                .await?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect()
        };
        let run_docs =
            RunBillingConverter::convert_all(&runs, &pipeline_names, window_start, window_end);

        let storages = self.client.list_storages().await?;
        let storage_docs = StorageBillingConverter::convert_all(&storages, prices, day);

        let run_report = self.writer.bulk_index(&run_docs).await?;
        let storage_report = self.writer.bulk_index(&storage_docs).await?;

        debug!(
            "Indexed {} run and {} storage document(s) for {}",
            run_report.indexed, storage_report.indexed, day
        );

        check_report(day, run_report)?;
        check_report(day, storage_report)
    }

    async fn push_offers(&self, prices: &PriceTable) {
        for (region, offers) in prices.offers_by_region() {
            let count = offers.len();
            match self.client.replace_offers(region, offers).await {
                Ok(_) => info!("Published {} instance offer(s) for {}", count, region),
                Err(e) => warn!("Failed to publish instance offers for {}: {}", region, e),
            }
        }
    }
}

fn check_report(day: NaiveDate, report: BulkReport) -> Result<()> {
    match report.failed.first() {
        None => Ok(()),
        Some((id, reason)) => Err(BillingError::IndexingFailed(format!(
            "{} document(s) of {} rejected, first {}: {}",
            report.failed.len(),
            day,
            id,
            reason
        ))),
    }
}

/// Days to bill, oldest first: from the day after `last_synced` (or from
/// `start_date`, or yesterday) through yesterday
pub fn days_to_sync(
    last_synced: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
        return Vec::new();
    };

    let first = match (last_synced, start_date) {
        (Some(last), _) => match last.succ_opt() {
            Some(next) => next,
            None => return Vec::new(),
        },
        (None, Some(start)) => start,
        (None, None) => yesterday,
    };

    first.iter_days().take_while(|day| *day <= yesterday).collect()
}
