//! Agent Configuration
//!
//! Aggregates the cache, transport and scheduler settings plus the
//! device-level files the agent reads and writes.

use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::network::TransportConfig;
use crate::sync::SchedulerConfig;

/// Default enrollment file written at provisioning.
pub const DEFAULT_ENROLLMENT_FILE: &str = "/var/lib/ods/enrollment.flag";

/// Default sync state file.
pub const DEFAULT_SYNC_STATE_FILE: &str = "/var/lib/ods/sync_state.json";

/// Default source of the board serial.
pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Configuration for a [`PlayerAgent`](super::PlayerAgent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Content cache and cloud API settings.
    pub cache: CacheConfig,

    /// Control channel settings.
    pub transport: TransportConfig,

    /// Heartbeat and poll timers.
    pub scheduler: SchedulerConfig,

    /// Enrollment record; the agent only connects when it exists.
    pub enrollment_file: PathBuf,

    /// Persisted sync state.
    pub sync_state_file: PathBuf,

    /// File holding the `Serial` line.
    pub cpuinfo_path: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            cache: CacheConfig::default(),
            transport: TransportConfig::default(),
            scheduler: SchedulerConfig::default(),
            enrollment_file: PathBuf::from(DEFAULT_ENROLLMENT_FILE),
            sync_state_file: PathBuf::from(DEFAULT_SYNC_STATE_FILE),
            cpuinfo_path: PathBuf::from(DEFAULT_CPUINFO_PATH),
        }
    }
}

impl AgentConfig {
    /// Creates a configuration with the given cache root.
    pub fn with_cache_root(root: impl Into<PathBuf>) -> Self {
        AgentConfig {
            cache: CacheConfig::default().with_root(root),
            ..Default::default()
        }
    }

    /// Sets the cloud base URL for both the API client and the control
    /// channel.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.transport = self.transport.with_server_url(&url);
        self.cache = self.cache.with_server_url(url);
        self
    }

    /// Sets the device bearer token for both the API client and the
    /// control channel.
    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.transport = self.transport.with_device_token(token.clone());
        self.cache = self.cache.with_device_token(token);
        self
    }

    /// Sets the enrollment file.
    pub fn with_enrollment_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.enrollment_file = path.into();
        self
    }

    /// Sets the sync state file.
    pub fn with_sync_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sync_state_file = path.into();
        self
    }

    /// Sets the cpuinfo file.
    pub fn with_cpuinfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpuinfo_path = path.into();
        self
    }

    /// Replaces the scheduler timers.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }
}
