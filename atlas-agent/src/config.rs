//! CLI Configuration

use std::path::PathBuf;

use atlas_core::api::{DEFAULT_ENROLLMENT_FILE, DEFAULT_SYNC_STATE_FILE};
use atlas_core::cache::{DEFAULT_CACHE_ROOT, DEFAULT_SERVER_URL};
use atlas_core::AgentConfig;
use clap::Args;

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct CliConfig {
    /// Cache root directory
    #[arg(long, global = true, env = "ODS_CACHE_DIR", default_value = DEFAULT_CACHE_ROOT)]
    pub cache_dir: PathBuf,

    /// Cloud API base URL
    #[arg(long, global = true, env = "ODS_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Device bearer token
    #[arg(
        long,
        global = true,
        env = "ODS_DEVICE_TOKEN",
        default_value = "system",
        hide_env_values = true
    )]
    pub device_token: String,

    /// Enrollment record written at provisioning
    #[arg(long, global = true, env = "ODS_ENROLLMENT_FILE", default_value = DEFAULT_ENROLLMENT_FILE)]
    pub enrollment_file: PathBuf,

    /// Persisted sync state
    #[arg(long, global = true, env = "ODS_SYNC_STATE_FILE", default_value = DEFAULT_SYNC_STATE_FILE)]
    pub sync_state_file: PathBuf,
}

impl CliConfig {
    /// Agent configuration for these settings.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::with_cache_root(&self.cache_dir)
            .with_server_url(&self.server_url)
            .with_device_token(&self.device_token)
            .with_enrollment_file(&self.enrollment_file)
            .with_sync_state_file(&self.sync_state_file)
    }
}
