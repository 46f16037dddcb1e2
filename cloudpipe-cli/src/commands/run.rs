//! Run command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use cloudpipe_client::ApiClient;
use cloudpipe_core::domain::run::{PipelineRun, RunInstance, TaskStatus};
use cloudpipe_core::dto::run::{LaunchRun, RunSummary};
use colored::*;

use super::{capitalize, format_time, parse_key_val, short_id};
use crate::id_resolver::{resolve_pipeline_id, resolve_run_id, resolve_run_id_in_pipeline};

#[derive(Subcommand)]
pub enum RunCommands {
    /// Launch a pipeline run
    Launch {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Branch or tag (default branch when absent)
        #[arg(short, long)]
        version: Option<String>,

        #[arg(long, env = "USER")]
        owner: String,

        #[arg(long)]
        node_type: String,

        #[arg(long)]
        region: String,

        /// Disk size in GB
        #[arg(long, default_value = "50")]
        disk: i32,

        #[arg(long)]
        spot: bool,

        /// Parameters as key=value pairs (e.g., reads=s3://bucket/sample.fastq)
        #[arg(short, long, value_parser = parse_key_val)]
        param: Vec<(String, String)>,
    },
    /// Get run details
    Get {
        /// Run ID or prefix of an active run
        id: String,
    },
    /// List runs that have not finished
    Active,
    /// List runs of a pipeline
    Pipeline {
        /// Pipeline ID or unambiguous prefix
        pipeline_id: String,

        /// Show one run of this pipeline, resolved by prefix
        #[arg(long)]
        run: Option<String>,
    },
    /// Stop a run
    Stop { id: String },
    /// Pause a running run
    Pause { id: String },
    /// Resume a paused run
    Resume { id: String },
    /// Set a run's status
    Status {
        id: String,

        /// New status (e.g., success, failure)
        status: String,
    },
}

pub async fn handle_run_command(command: RunCommands, client: &ApiClient) -> Result<()> {
    match command {
        RunCommands::Launch {
            pipeline,
            version,
            owner,
            node_type,
            region,
            disk,
            spot,
            param,
        } => {
            let pipeline_id = resolve_pipeline_id(client, &pipeline).await?;
            let run = client
                .launch_run(LaunchRun {
                    pipeline_id: Some(pipeline_id),
                    version,
                    owner,
                    instance: RunInstance {
                        node_type,
                        cloud_region: region,
                        disk_size_gb: disk,
                        spot,
                    },
                    parameters: param.into_iter().collect(),
                    parent_run_id: None,
                })
                .await?;

            println!("{} Launched run {}", "✓".green(), run.id.to_string().cyan());
            println!(
                "  Price: {}/h",
                run.prices.price_per_hour().normalize().to_string().bold()
            );
            Ok(())
        }
        RunCommands::Get { id } => {
            let id = resolve_run_id(client, &id).await?;
            print_run_details(&client.get_run(id).await?);
            Ok(())
        }
        RunCommands::Active => {
            let runs = client.list_active_runs().await?;
            print_run_list(&runs, "No active runs.");
            Ok(())
        }
        RunCommands::Pipeline { pipeline_id, run } => {
            let pipeline_id = resolve_pipeline_id(client, &pipeline_id).await?;

            if let Some(run) = run {
                let run_id = resolve_run_id_in_pipeline(client, pipeline_id, &run).await?;
                print_run_details(&client.get_run(run_id).await?);
                return Ok(());
            }

            let runs = client.list_runs_by_pipeline(pipeline_id).await?;
            print_run_list(&runs, "No runs found for this pipeline.");
            Ok(())
        }
        RunCommands::Stop { id } => {
            let id = resolve_run_id(client, &id).await?;
            print_status_change(&client.stop_run(id).await?);
            Ok(())
        }
        RunCommands::Pause { id } => {
            let id = resolve_run_id(client, &id).await?;
            print_status_change(&client.pause_run(id).await?);
            Ok(())
        }
        RunCommands::Resume { id } => {
            let id = resolve_run_id(client, &id).await?;
            print_status_change(&client.resume_run(id).await?);
            Ok(())
        }
        RunCommands::Status { id, status } => {
            let status = TaskStatus::parse(&capitalize(&status))
                .with_context(|| format!("Unknown status: {}", status))?;
            let id = resolve_run_id(client, &id).await?;
            print_status_change(&client.update_run_status(id, status).await?);
            Ok(())
        }
    }
}

fn print_run_list(runs: &[RunSummary], empty_message: &str) {
    if runs.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }

    println!(
        "  {:<10} {:<10} {:<16} {:<14} {}",
        "ID".bold(),
        "STATUS".bold(),
        "OWNER".bold(),
        "NODE".bold(),
        "STARTED".bold()
    );
    for run in runs {
        println!(
            "  {:<10} {:<10} {:<16} {:<14} {}",
            short_id(&run.id).cyan(),
            colorize_status(&run.status),
            run.owner,
            run.node_type,
            format_time(&run.start_date).dimmed()
        );
    }
}

fn print_status_change(run: &PipelineRun) {
    println!(
        "{} Run {} is now {}",
        "✓".green(),
        run.id.to_string().dimmed(),
        colorize_status(&run.status)
    );
}

fn print_run_details(run: &PipelineRun) {
    println!("{}", "Run Details:".bold());
    println!("  ID:        {}", run.id.to_string().cyan());
    if let Some(pipeline_id) = run.pipeline_id {
        println!("  Pipeline:  {}", pipeline_id.to_string().dimmed());
    }
    if let Some(version) = &run.version {
        println!("  Version:   {}", version);
    }
    println!("  Owner:     {}", run.owner);
    println!("  Status:    {}", colorize_status(&run.status));
    println!("  Started:   {}", format_time(&run.start_date));
    if let Some(end) = run.end_date {
        println!("  Finished:  {}", format_time(&end));
        let minutes = end.signed_duration_since(run.start_date).num_minutes();
        println!("  Duration:  {}m", minutes);
    }

    println!("\n{}", "Instance:".bold());
    println!("  Node type: {}", run.instance.node_type);
    println!("  Region:    {}", run.instance.cloud_region);
    println!("  Disk:      {} GB", run.instance.disk_size_gb);
    println!("  Spot:      {}", if run.instance.spot { "yes" } else { "no" });
    println!(
        "  Price:     {}/h (compute {}, disk {})",
        run.prices.price_per_hour().normalize(),
        run.prices.compute_price_per_hour.normalize(),
        run.prices.disk_price_per_hour.normalize()
    );

    if !run.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        let mut params: Vec<_> = run.parameters.iter().collect();
        params.sort();
        for (key, value) in params {
            println!("  {} = {}", key.cyan(), value);
        }
    }

    if !run.status_history.is_empty() {
        println!("\n{}", "History:".bold());
        for change in &run.status_history {
            println!(
                "  {} {}",
                format_time(&change.timestamp).dimmed(),
                colorize_status(&change.status)
            );
        }
    }
}

fn colorize_status(status: &TaskStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        TaskStatus::Running => status_str.cyan(),
        TaskStatus::Pausing | TaskStatus::Resuming => status_str.yellow(),
        TaskStatus::Paused => status_str.blue(),
        TaskStatus::Success => status_str.green(),
        TaskStatus::Failure => status_str.red(),
        TaskStatus::Stopped => status_str.dimmed(),
    }
}
