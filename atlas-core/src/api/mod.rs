// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Agent API Layer
//!
//! High-level API for embedding the sync agent in a player process.
//!
//! # Overview
//!
//! The API layer coordinates:
//! - Device identity and enrollment
//! - The cloud connection and its timers
//! - Sync cycles against the content cache
//! - Status and content queries for the local HTTP layer
//! - Event handling for the renderer
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event system for callbacks
//! - [`identity`] - Enrollment and hardware identity
//! - [`agent`] - Main agent orchestrator

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;

pub use agent::{AgentStatus, PlayerAgent};
pub use config::{
    AgentConfig, DEFAULT_CPUINFO_PATH, DEFAULT_ENROLLMENT_FILE, DEFAULT_SYNC_STATE_FILE,
};
pub use error::{AgentError, AgentResult};
pub use events::{AgentEvent, CallbackHandler, EventDispatcher, EventHandler};
pub use identity::{Enrollment, UNKNOWN_HARDWARE_ID};
