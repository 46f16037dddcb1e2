//! Transfer command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use cloudpipe_client::ApiClient;
use cloudpipe_core::domain::transfer::{TransferStatus, TransferTask};
use cloudpipe_core::dto::transfer::CreateTransferTask;
use colored::*;

use super::{capitalize, format_time, short_id};
use crate::id_resolver::resolve_transfer_id;

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Queue a copy from source to destination
    Create { source: String, destination: String },
    /// List transfers
    List {
        /// Only transfers in this status (created, running, success, failure)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Get transfer details
    Get { id: String },
    /// Delete a transfer that is not running
    Delete { id: String },
}

pub async fn handle_transfer_command(command: TransferCommands, client: &ApiClient) -> Result<()> {
    match command {
        TransferCommands::Create {
            source,
            destination,
        } => {
            let task = client
                .create_transfer(CreateTransferTask {
                    source,
                    destination,
                })
                .await?;
            println!("{} Queued transfer {}", "✓".green(), task.id.to_string().cyan());
            Ok(())
        }
        TransferCommands::List { status } => {
            let status = match status {
                Some(status) => Some(
                    TransferStatus::parse(&capitalize(&status))
                        .with_context(|| format!("Unknown transfer status: {}", status))?,
                ),
                None => None,
            };
            let tasks = client.list_transfers(status).await?;

            if tasks.is_empty() {
                println!("{}", "No transfers found.".yellow());
                return Ok(());
            }
            for task in &tasks {
                println!(
                    "  {} {:<8} {} → {}",
                    short_id(&task.id).dimmed(),
                    colorize_status(&task.status),
                    task.source,
                    task.destination
                );
            }
            Ok(())
        }
        TransferCommands::Get { id } => {
            let id = resolve_transfer_id(client, &id).await?;
            print_transfer_details(&client.get_transfer(id).await?);
            Ok(())
        }
        TransferCommands::Delete { id } => {
            let id = resolve_transfer_id(client, &id).await?;
            client.delete_transfer(id).await?;
            println!("{} Deleted transfer {}", "✓".green(), id.to_string().dimmed());
            Ok(())
        }
    }
}

fn print_transfer_details(task: &TransferTask) {
    println!("{}", "Transfer Details:".bold());
    println!("  ID:          {}", task.id.to_string().cyan());
    println!("  Source:      {}", task.source);
    println!("  Destination: {}", task.destination);
    println!("  Status:      {}", colorize_status(&task.status));
    println!("  Created:     {}", format_time(&task.created_at));
    if let Some(started) = task.started_at {
        println!("  Started:     {}", format_time(&started));
    }
    if let Some(finished) = task.finished_at {
        println!("  Finished:    {}", format_time(&finished));
    }
    if let Some(runner) = &task.runner_id {
        println!("  Runner:      {}", runner);
    }
    if let Some(reason) = &task.reason {
        println!("\n{}", "Reason:".bold());
        println!("{}", reason.red());
    }
}

fn colorize_status(status: &TransferStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        TransferStatus::Created => status_str.yellow(),
        TransferStatus::Running => status_str.cyan(),
        TransferStatus::Success => status_str.green(),
        TransferStatus::Failure => status_str.red(),
    }
}
