//! Pipeline command handlers
//!
//! Pipeline records, their Git versions and their source files.

use anyhow::{Context, Result};
use clap::Subcommand;
use cloudpipe_client::ApiClient;
use cloudpipe_core::domain::pipeline::{Pipeline, RepositoryKind, RepositoryRef};
use cloudpipe_core::dto::pipeline::{CommitSourceFile, CreatePipeline, VersionKind};
use colored::*;

use super::{capitalize, format_time};
use crate::id_resolver::{resolve_folder_id, resolve_pipeline_id};

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Register a pipeline
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Folder ID or unambiguous prefix
        #[arg(short, long)]
        folder: Option<String>,

        /// Git host flavour (gitlab or bitbucket)
        #[arg(long, requires = "repo_url", requires = "project")]
        repo_kind: Option<String>,

        /// Base URL of the Git host
        #[arg(long)]
        repo_url: Option<String>,

        /// Project path on the Git host
        #[arg(long)]
        project: Option<String>,

        /// Access token for the Git host
        #[arg(long, env = "CLOUDPIPE_GIT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Create the repository on the Git host first
        #[arg(long)]
        create_repository: bool,

        /// Tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// List all pipelines
    List,
    /// Get pipeline details
    Get {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Move a pipeline to another folder
    Move {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Target folder (root when absent)
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Delete a pipeline
    Delete {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Also delete the repository on the Git host
        #[arg(long)]
        delete_repository: bool,
    },
    /// List branches and tags
    Versions {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// List a directory of the pipeline sources
    Source {
        /// Pipeline ID or unambiguous prefix
        id: String,

        #[arg(short, long)]
        version: Option<String>,

        #[arg(short, long)]
        path: Option<String>,
    },
    /// Print a source file
    Cat {
        /// Pipeline ID or unambiguous prefix
        id: String,
        path: String,

        #[arg(short, long)]
        version: Option<String>,
    },
    /// Commit a local file into the pipeline sources
    Commit {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// Path in the repository
        path: String,

        /// Local file to upload
        #[arg(short, long)]
        file: String,

        #[arg(short, long)]
        message: String,

        /// Target branch (default branch when absent)
        #[arg(short, long)]
        branch: Option<String>,
    },
}

pub async fn handle_pipeline_command(command: PipelineCommands, client: &ApiClient) -> Result<()> {
    match command {
        PipelineCommands::Create {
            name,
            description,
            folder,
            repo_kind,
            repo_url,
            project,
            token,
            create_repository,
            tags,
        } => {
            let folder_id = match folder {
                Some(folder) => Some(resolve_folder_id(client, &folder).await?),
                None => None,
            };
            let repository = match (repo_kind, repo_url, project) {
                (Some(kind), Some(url), Some(project)) => Some(RepositoryRef {
                    kind: RepositoryKind::parse(&capitalize(&kind))
                        .with_context(|| format!("Unknown repository kind: {}", kind))?,
                    url,
                    project,
                    token,
                }),
                _ => None,
            };

            let pipeline = client
                .create_pipeline(CreatePipeline {
                    name,
                    description,
                    folder_id,
                    repository,
                    tags,
                    create_repository,
                })
                .await?;

            println!("{} Created pipeline {}", "✓".green(), pipeline.name.bold());
            println!("  ID: {}", pipeline.id.to_string().cyan());
            Ok(())
        }
        PipelineCommands::List => list_pipelines(client).await,
        PipelineCommands::Get { id } => {
            let id = resolve_pipeline_id(client, &id).await?;
            print_pipeline_details(&client.get_pipeline(id).await?);
            Ok(())
        }
        PipelineCommands::Move { id, folder } => {
            let id = resolve_pipeline_id(client, &id).await?;
            let folder_id = match folder {
                Some(folder) => Some(resolve_folder_id(client, &folder).await?),
                None => None,
            };
            let pipeline = client.move_pipeline(id, folder_id).await?;
            println!("{} Moved pipeline {}", "✓".green(), pipeline.name.bold());
            Ok(())
        }
        PipelineCommands::Delete {
            id,
            delete_repository,
        } => {
            let id = resolve_pipeline_id(client, &id).await?;
            client.delete_pipeline(id, delete_repository).await?;
            println!("{} Deleted pipeline {}", "✓".green(), id.to_string().dimmed());
            Ok(())
        }
        PipelineCommands::Versions { id } => list_versions(client, &id).await,
        PipelineCommands::Source { id, version, path } => {
            let id = resolve_pipeline_id(client, &id).await?;
            let entries = client
                .list_source(id, version.as_deref(), path.as_deref())
                .await?;

            if entries.is_empty() {
                println!("{}", "Directory is empty.".yellow());
            }
            for entry in entries {
                if entry.is_directory {
                    println!("  {}/", entry.name.blue().bold());
                } else {
                    println!("  {}", entry.name);
                }
            }
            Ok(())
        }
        PipelineCommands::Cat { id, path, version } => {
            let id = resolve_pipeline_id(client, &id).await?;
            let content = client
                .get_source_file(id, version.as_deref(), &path)
                .await?;
            print!("{}", String::from_utf8_lossy(&content));
            Ok(())
        }
        PipelineCommands::Commit {
            id,
            path,
            file,
            message,
            branch,
        } => {
            let id = resolve_pipeline_id(client, &id).await?;
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read file: {}", file))?;

            let commit = client
                .commit_source_file(
                    id,
                    CommitSourceFile {
                        branch,
                        path: path.clone(),
                        content,
                        message,
                    },
                )
                .await?;

            println!("{} Committed {} as {}", "✓".green(), path.bold(), commit.cyan());
            Ok(())
        }
    }
}

async fn list_pipelines(client: &ApiClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} pipeline(s):", pipelines.len()).bold());
    println!();
    for pipeline in pipelines {
        println!("  {} {}", "▸".cyan(), pipeline.name.bold());
        println!("    ID:      {}", pipeline.id.to_string().dimmed());
        if let Some(desc) = &pipeline.description {
            println!("    {}", desc);
        }
        if !pipeline.tags.is_empty() {
            println!("    Tags:    {}", pipeline.tags.join(", ").yellow());
        }
        println!("    Updated: {}", format_time(&pipeline.updated_at).dimmed());
        println!();
    }

    Ok(())
}

async fn list_versions(client: &ApiClient, id: &str) -> Result<()> {
    let id = resolve_pipeline_id(client, id).await?;
    let versions = client.list_versions(id).await?;

    if versions.is_empty() {
        println!("{}", "No branches or tags found.".yellow());
        return Ok(());
    }

    for version in versions {
        let kind = match version.kind {
            VersionKind::Branch => "branch".green(),
            VersionKind::Tag => "tag".magenta(),
        };
        println!(
            "  {:<7} {} {}",
            kind,
            version.name.bold(),
            version.commit.chars().take(12).collect::<String>().dimmed()
        );
    }

    Ok(())
}

fn print_pipeline_details(pipeline: &Pipeline) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:          {}", pipeline.id.to_string().cyan());
    println!("  Name:        {}", pipeline.name.bold());
    if let Some(desc) = &pipeline.description {
        println!("  Description: {}", desc);
    }
    if let Some(folder_id) = pipeline.folder_id {
        println!("  Folder:      {}", folder_id.to_string().dimmed());
    }
    if !pipeline.tags.is_empty() {
        println!("  Tags:        {}", pipeline.tags.join(", ").yellow());
    }
    println!("  Created:     {}", format_time(&pipeline.created_at));
    println!("  Updated:     {}", format_time(&pipeline.updated_at));

    if let Some(repo) = &pipeline.repository {
        println!("\n{}", "Repository:".bold());
        println!("  Kind:    {}", repo.kind);
        println!("  URL:     {}", repo.url);
        println!("  Project: {}", repo.project.cyan());
    }
}
