//! Folder command handlers

use anyhow::Result;
use clap::Subcommand;
use cloudpipe_client::ApiClient;
use cloudpipe_core::dto::folder::{CreateFolder, FolderTree};
use cloudpipe_core::dto::pipeline::PipelineSummary;
use colored::*;

use super::short_id;
use crate::id_resolver::resolve_folder_id;

#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create a folder
    Create {
        name: String,

        /// Parent folder ID or unambiguous prefix (root when absent)
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Show the folder tree with its pipelines
    Tree,
    /// Rename a folder
    Rename {
        /// Folder ID or unambiguous prefix
        id: String,
        name: String,
    },
    /// Delete an empty folder
    Delete {
        /// Folder ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_folder_command(command: FolderCommands, client: &ApiClient) -> Result<()> {
    match command {
        FolderCommands::Create { name, parent } => create_folder(client, name, parent).await,
        FolderCommands::Tree => show_tree(client).await,
        FolderCommands::Rename { id, name } => {
            let id = resolve_folder_id(client, &id).await?;
            let folder = client.rename_folder(id, name).await?;
            println!("{} Renamed folder to {}", "✓".green(), folder.name.bold());
            Ok(())
        }
        FolderCommands::Delete { id } => {
            let id = resolve_folder_id(client, &id).await?;
            client.delete_folder(id).await?;
            println!("{} Deleted folder {}", "✓".green(), id.to_string().dimmed());
            Ok(())
        }
    }
}

async fn create_folder(client: &ApiClient, name: String, parent: Option<String>) -> Result<()> {
    let parent_id = match parent {
        Some(parent) => Some(resolve_folder_id(client, &parent).await?),
        None => None,
    };

    let folder = client.create_folder(CreateFolder { name, parent_id }).await?;

    println!("{} Created folder {}", "✓".green(), folder.name.bold());
    println!("  ID: {}", folder.id.to_string().cyan());
    Ok(())
}

async fn show_tree(client: &ApiClient) -> Result<()> {
    let hierarchy = client.folder_tree().await?;

    if hierarchy.folders.is_empty() && hierarchy.pipelines.is_empty() {
        println!("{}", "No folders or pipelines found.".yellow());
        return Ok(());
    }

    for tree in &hierarchy.folders {
        print_tree(tree, 0);
    }
    for pipeline in &hierarchy.pipelines {
        print_pipeline(pipeline, 0);
    }

    Ok(())
}

fn print_tree(tree: &FolderTree, depth: usize) {
    println!(
        "{}{} {}/ {}",
        "  ".repeat(depth),
        "▸".cyan(),
        tree.folder.name.bold(),
        short_id(&tree.folder.id).dimmed()
    );
    for child in &tree.children {
        print_tree(child, depth + 1);
    }
    for pipeline in &tree.pipelines {
        print_pipeline(pipeline, depth + 1);
    }
}

fn print_pipeline(pipeline: &PipelineSummary, depth: usize) {
    println!(
        "{}  {} {}",
        "  ".repeat(depth),
        pipeline.name,
        short_id(&pipeline.id).dimmed()
    );
}
