//! Cloudpipe CLI
//!
//! Command-line interface for the Cloudpipe API.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "cloudpipe")]
#[command(about = "Cloudpipe pipeline platform CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "CLOUDPIPE_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
    };

    handle_command(cli.command, &config).await
}
