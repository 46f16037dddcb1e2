//! Transfer poller
//!
//! Polls the API for created transfer tasks, claims them and copies the data.
//! Each transfer runs in its own task while holding a semaphore permit.

use anyhow::{Context, Result};
use cloudpipe_client::ApiClient;
use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::FinishTransfer;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::copy::{copy_path, local_path};

pub struct TransferPoller {
    config: Config,
    client: Arc<ApiClient>,
    semaphore: Arc<Semaphore>,
}

impl TransferPoller {
    pub fn new(config: Config, client: Arc<ApiClient>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_transfers));
        Self {
            config,
            client,
            semaphore,
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting transfer poller (interval: {:?})",
            self.config.poll_interval
        );

        let mut interval = time::interval(self.config.poll_interval);

        loop {
            interval.tick().await;

            match self.poll_once().await {
                Ok(0) => debug!("No transfers this cycle"),
                Ok(count) => info!("Processed {} transfer(s) this cycle", count),
                Err(e) => error!("Error during poll cycle: {:#}", e),
            }
        }
    }

    /// Starts every created transfer a permit is available for and waits for them
    pub async fn poll_once(&self) -> Result<usize> {
        let tasks = self
            .client
            .list_transfers(Some(TransferStatus::Created))
            .await
            .context("Failed to fetch created transfers")?;

        if tasks.is_empty() {
            return Ok(0);
        }

        info!("Found {} created transfer(s)", tasks.len());

        let mut handles = Vec::new();
        for task in tasks {
            match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => handles.push(self.spawn_transfer(task, permit)),
                Err(_) => {
                    debug!(
                        "Max parallel transfers reached, leaving {} for later",
                        task.id
                    );
                    break;
                }
            }
        }

        let started = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Transfer task panicked: {}", e);
            }
        }

        Ok(started)
    }

    fn spawn_transfer(
        &self,
        task: TransferTask,
        permit: OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let runner_id = self.config.runner_id.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let task_id = task.id;
            if let Err(e) = Self::execute_transfer(task, &runner_id, &client).await {
                error!("Transfer {} failed to complete: {:#}", task_id, e);
            }
        })
    }

    /// Claims and copies one transfer; `Ok(false)` when another runner won the claim
    async fn execute_transfer(task: TransferTask, runner_id: &str, client: &ApiClient) -> Result<bool> {
        match client.claim_transfer(task.id, runner_id).await {
            Ok(_) => {}
            Err(e) if e.is_conflict() => {
                debug!("Transfer {} was claimed by another runner", task.id);
                return Ok(false);
            }
            Err(e) => return Err(e).context("Failed to claim transfer"),
        }

        info!(
            "Copying {} to {} (transfer {})",
            task.source, task.destination, task.id
        );

        let source = local_path(&task.source);
        let destination = local_path(&task.destination);
        let outcome = match copy_path(&source, &destination).await {
            Ok(stats) => {
                info!(
                    "Transfer {} copied {} file(s), {} bytes",
                    task.id, stats.files, stats.bytes
                );
                FinishTransfer::success(runner_id)
            }
            Err(e) => {
                warn!("Transfer {} failed: {:#}", task.id, e);
                FinishTransfer::failure(runner_id, format!("{:#}", e))
            }
        };

        client
            .finish_transfer(task.id, outcome)
            .await
            .context("Failed to report transfer result")?;

        Ok(true)
    }
}
