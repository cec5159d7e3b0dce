//! Sync Command
//!
//! Runs one sync cycle and prints its outcome.

use anyhow::{bail, Result};
use atlas_core::{AgentError, PlayerAgent, SyncTrigger};

use crate::config::CliConfig;

/// Runs a single sync cycle for the persisted player id.
pub async fn run(config: &CliConfig) -> Result<()> {
    let agent = PlayerAgent::new(config.agent_config()).await?;
    match agent.trigger_sync(SyncTrigger::Manual).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(AgentError::NotRegistered) => {
            bail!("No player id yet. Start the agent with `atlas-agent run` to register.")
        }
        Err(e) => Err(e.into()),
    }
}
