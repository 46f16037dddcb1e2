//! ID resolver module
//!
//! Resolves UUID prefixes to full UUIDs by listing the matching resources.
//! Full UUIDs are returned without calling the API.

use anyhow::{Context, Result, anyhow};
use cloudpipe_client::ApiClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Pick the single candidate matching `id_or_prefix`
pub fn resolve_among(
    kind: &str,
    id_or_prefix: &IdOrPrefix,
    candidates: impl IntoIterator<Item = Uuid>,
) -> Result<Uuid> {
    let matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id_or_prefix.matches(id))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No {} found with ID starting with '{}'",
            kind,
            id_or_prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                id_or_prefix,
                kind,
                ids.join(", ")
            ))
        }
    }
}

pub async fn resolve_folder_id(client: &ApiClient, input: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let hierarchy = client
        .folder_tree()
        .await
        .context("Failed to fetch folders for ID resolution")?;

    let mut ids = Vec::new();
    let mut pending: Vec<_> = hierarchy.folders.iter().collect();
    while let Some(tree) = pending.pop() {
        ids.push(tree.folder.id);
        pending.extend(tree.children.iter());
    }

    resolve_among("folder", &id_or_prefix, ids)
}

pub async fn resolve_pipeline_id(client: &ApiClient, input: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let pipelines = client
        .list_pipelines()
        .await
        .context("Failed to fetch pipelines for ID resolution")?;

    resolve_among("pipeline", &id_or_prefix, pipelines.iter().map(|p| p.id))
}

/// Prefixes are resolved among active runs
pub async fn resolve_run_id(client: &ApiClient, input: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let runs = client
        .list_active_runs()
        .await
        .context("Failed to fetch active runs for ID resolution")?;

    resolve_among("active run", &id_or_prefix, runs.iter().map(|r| r.id))
}

/// Resolve a run ID or prefix among the runs of one pipeline
pub async fn resolve_run_id_in_pipeline(
    client: &ApiClient,
    pipeline_id: Uuid,
    input: &str,
) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let runs = client
        .list_runs_by_pipeline(pipeline_id)
        .await
        .context("Failed to fetch pipeline runs for ID resolution")?;

    resolve_among("run", &id_or_prefix, runs.iter().map(|r| r.id))
}

pub async fn resolve_schedule_id(client: &ApiClient, input: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let schedules = client
        .list_schedules(None)
        .await
        .context("Failed to fetch schedules for ID resolution")?;

    resolve_among(
        "schedule",
        &id_or_prefix,
        schedules.iter().map(|s| s.schedule.id),
    )
}

pub async fn resolve_transfer_id(client: &ApiClient, input: &str) -> Result<Uuid> {
    let id_or_prefix = IdOrPrefix::parse(input);
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let transfers = client
        .list_transfers(None)
        .await
        .context("Failed to fetch transfers for ID resolution")?;

    resolve_among("transfer", &id_or_prefix, transfers.iter().map(|t| t.id))
}
