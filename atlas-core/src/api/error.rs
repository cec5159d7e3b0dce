// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the agent API layer.

use thiserror::Error;

use crate::cache::{CacheError, FetchError};
use crate::network::NetworkError;
use crate::sync::SyncStateError;

/// Unified error type for agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cloud API client could not be built.
    #[error("cloud API error: {0}")]
    Fetch(#[from] FetchError),

    /// Control channel failed.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Sync state could not be read or written.
    #[error("sync state error: {0}")]
    SyncState(#[from] SyncStateError),

    /// No player id yet; the cloud has not acknowledged registration.
    #[error("player not registered")]
    NotRegistered,

    /// Agent is already running.
    #[error("agent already running")]
    AlreadyRunning,

    /// Filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
