//! Schedule command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use cloudpipe_client::ApiClient;
use cloudpipe_core::domain::schedule::{ScheduleAction, ScheduleTarget};
use cloudpipe_core::dto::schedule::{CreateSchedule, ScheduleInfo};
use colored::*;

use super::{capitalize, format_time, short_id};
use crate::id_resolver::{resolve_pipeline_id, resolve_run_id, resolve_schedule_id};

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Schedule pause/resume of a run, or new runs of a pipeline
    Create {
        /// pause, resume (runs) or run (pipelines)
        action: String,

        /// Five-field cron expression, e.g. "0 20 * * 1-5"
        cron: String,

        /// Target run ID or prefix
        #[arg(long, conflicts_with = "pipeline", required_unless_present = "pipeline")]
        run: Option<String>,

        /// Target pipeline ID or prefix
        #[arg(long)]
        pipeline: Option<String>,

        /// IANA time zone of the cron expression
        #[arg(long, default_value = "UTC")]
        tz: String,
    },
    /// List schedules
    List {
        #[arg(long, conflicts_with = "pipeline")]
        run: Option<String>,

        #[arg(long)]
        pipeline: Option<String>,
    },
    /// Get schedule details
    Get { id: String },
    /// Delete a schedule
    Delete { id: String },
}

pub async fn handle_schedule_command(command: ScheduleCommands, client: &ApiClient) -> Result<()> {
    match command {
        ScheduleCommands::Create {
            action,
            cron,
            run,
            pipeline,
            tz,
        } => {
            let action = ScheduleAction::parse(&capitalize(&action))
                .with_context(|| format!("Unknown schedule action: {}", action))?;
            let target = resolve_target(client, run, pipeline)
                .await?
                .context("Either --run or --pipeline is required")?;

            let info = client
                .create_schedule(CreateSchedule {
                    target,
                    action,
                    cron_expression: cron,
                    time_zone: tz,
                })
                .await?;

            println!(
                "{} Created schedule {}",
                "✓".green(),
                info.schedule.id.to_string().cyan()
            );
            print_next_fire(&info);
            Ok(())
        }
        ScheduleCommands::List { run, pipeline } => {
            let target = resolve_target(client, run, pipeline).await?;
            let schedules = client.list_schedules(target).await?;

            if schedules.is_empty() {
                println!("{}", "No schedules found.".yellow());
                return Ok(());
            }

            for info in &schedules {
                println!(
                    "  {} {} {} on {} {} ({} {})",
                    "▸".cyan(),
                    short_id(&info.schedule.id).dimmed(),
                    info.schedule.action.as_str().bold(),
                    info.schedule.target.kind_str().to_lowercase(),
                    short_id(&info.schedule.target.id()),
                    info.schedule.cron_expression.yellow(),
                    info.schedule.time_zone
                );
            }
            Ok(())
        }
        ScheduleCommands::Get { id } => {
            let id = resolve_schedule_id(client, &id).await?;
            let info = client.get_schedule(id).await?;

            println!("{}", "Schedule Details:".bold());
            println!("  ID:        {}", info.schedule.id.to_string().cyan());
            println!("  Action:    {}", info.schedule.action);
            println!(
                "  Target:    {} {}",
                info.schedule.target.kind_str(),
                info.schedule.target.id()
            );
            println!("  Cron:      {}", info.schedule.cron_expression.yellow());
            println!("  Time zone: {}", info.schedule.time_zone);
            println!("  Created:   {}", format_time(&info.schedule.created_at));
            if let Some(fired) = info.schedule.last_fired_at {
                println!("  Last fired: {}", format_time(&fired));
            }
            print_next_fire(&info);
            Ok(())
        }
        ScheduleCommands::Delete { id } => {
            let id = resolve_schedule_id(client, &id).await?;
            client.delete_schedule(id).await?;
            println!("{} Deleted schedule {}", "✓".green(), id.to_string().dimmed());
            Ok(())
        }
    }
}

async fn resolve_target(
    client: &ApiClient,
    run: Option<String>,
    pipeline: Option<String>,
) -> Result<Option<ScheduleTarget>> {
    match (run, pipeline) {
        (Some(run), _) => Ok(Some(ScheduleTarget::Run(resolve_run_id(client, &run).await?))),
        (None, Some(pipeline)) => Ok(Some(ScheduleTarget::Pipeline(
            resolve_pipeline_id(client, &pipeline).await?,
        ))),
        (None, None) => Ok(None),
    }
}

fn print_next_fire(info: &ScheduleInfo) {
    match info.next_fire_at {
        Some(next) => println!("  Next:      {} UTC", format_time(&next).green()),
        None => println!("  Next:      {}", "never".dimmed()),
    }
}
