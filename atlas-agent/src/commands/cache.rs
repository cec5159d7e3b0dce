//! Cache Commands
//!
//! Read-only queries and maintenance on the local cache.

use anyhow::Result;
use atlas_core::cache::{clean_stale as sweep_stale, CacheLayout, OfflineReader};
use atlas_core::AgentStatus;

use crate::config::CliConfig;

// These run beside a live agent, so they read the cache without creating it.

/// Prints the agent status as JSON.
pub async fn status(config: &CliConfig) -> Result<()> {
    let status = AgentStatus::read(&config.agent_config()).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Prints the renderable content as JSON (`null` when nothing is cached).
pub async fn content(config: &CliConfig) -> Result<()> {
    let reader = OfflineReader::new(&CacheLayout::new(&config.cache_dir));
    println!(
        "{}",
        serde_json::to_string_pretty(&reader.renderable_content().await)?
    );
    Ok(())
}

/// Deletes stale files older than `max_age_days`.
pub async fn clean_stale(config: &CliConfig, max_age_days: u64) -> Result<()> {
    let stale_dir = CacheLayout::new(&config.cache_dir).stale_dir();
    let cleaned = sweep_stale(&stale_dir, max_age_days).await?;
    println!("Cleaned {} stale file(s)", cleaned);
    Ok(())
}
