//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod folder;
mod pipeline;
mod run;
mod schedule;
mod transfer;

pub use folder::FolderCommands;
pub use pipeline::PipelineCommands;
pub use run::RunCommands;
pub use schedule::ScheduleCommands;
pub use transfer::TransferCommands;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Folder management
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Pipeline management
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Run schedules
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Data transfer tasks
    Transfer {
        #[command(subcommand)]
        command: TransferCommands,
    },
}

/// Routes the command to the appropriate handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        Commands::Folder { command } => folder::handle_folder_command(command, &client).await,
        Commands::Pipeline { command } => {
            pipeline::handle_pipeline_command(command, &client).await
        }
        Commands::Run { command } => run::handle_run_command(command, &client).await,
        Commands::Schedule { command } => {
            schedule::handle_schedule_command(command, &client).await
        }
        Commands::Transfer { command } => {
            transfer::handle_transfer_command(command, &client).await
        }
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// First block of a UUID, enough to pass back as a prefix
fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// "running" -> "Running", matching the API's status names
fn capitalize(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("reads=s3://bucket/a=b").unwrap(),
            ("reads".to_string(), "s3://bucket/a=b".to_string())
        );
        assert!(parse_key_val("no-separator").is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("running"), "Running");
        assert_eq!(capitalize("PAUSED"), "Paused");
        assert_eq!(capitalize(""), "");
    }
}
