//! Run Command
//!
//! Keeps the cloud connection and timers alive until Ctrl-C.

use anyhow::Result;
use atlas_core::{AgentEvent, CallbackHandler, PlayerAgent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::CliConfig;

/// Runs the agent daemon.
pub async fn run(config: &CliConfig) -> Result<()> {
    let agent = PlayerAgent::new(config.agent_config()).await?;
    agent.add_event_handler(Arc::new(CallbackHandler::new(|event| {
        if let AgentEvent::ContentReady {
            downloaded,
            removed,
        } = event
        {
            info!(downloaded, removed, "content ready");
        }
    })));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        signal.cancel();
    });

    agent.run(shutdown).await?;
    Ok(())
}
