//! Atlas Agent
//!
//! On-device daemon for Atlas signage players. Provides:
//! - Persistent cloud connection with registration, heartbeat and polling
//! - Content sync into the local verified cache
//! - Offline status and content queries

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

use atlas_core::cache::DEFAULT_STALE_MAX_AGE_DAYS;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "atlas-agent")]
#[command(version, about = "Content cache and cloud sync agent for Atlas players")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: CliConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the cloud and keep content in sync until Ctrl-C
    Run,

    /// Run one sync cycle and print its outcome
    Sync,

    /// Show connection and cache status
    Status,

    /// Show the content the renderer can play from cache
    Content,

    /// Delete old files from the stale area
    CleanStale {
        /// Maximum age in days
        #[arg(long, default_value_t = DEFAULT_STALE_MAX_AGE_DAYS)]
        max_age_days: u64,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("atlas_agent=info,atlas_core=info")
                }),
        )
        .init();

    let cli = Cli::parse();

    // Players are single-core boards; one thread is plenty
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Run => commands::run::run(&cli.config).await,
            Commands::Sync => commands::sync::run(&cli.config).await,
            Commands::Status => commands::cache::status(&cli.config).await,
            Commands::Content => commands::cache::content(&cli.config).await,
            Commands::CleanStale { max_age_days } => {
                commands::cache::clean_stale(&cli.config, max_age_days).await
            }
        }
    })
}
