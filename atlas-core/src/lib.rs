// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Atlas Core Library
//!
//! Content cache engine and cloud sync client for Atlas signage players.
//! Keeps a verified local copy of every asset in the server-declared
//! playlist so the player keeps running while offline.

pub mod api;
pub mod cache;
pub mod network;
pub mod sync;

pub use api::{
    AgentConfig, AgentError, AgentEvent, AgentResult, AgentStatus, CallbackHandler,
    EventDispatcher, EventHandler, PlayerAgent,
};
pub use cache::{
    Asset, CacheConfig, CacheError, CacheLayout, ConfigSnapshot, ManifestEntry, OfflineReader,
    RenderableContent, SkipReason, SyncOrchestrator, SyncOutcome,
};
pub use network::{
    CloudConnection, ConnectionState, InboundEvent, MockTransport, NetworkError, OutboundEvent,
    Session, Transport, TransportConfig,
};
pub use sync::{Scheduler, SchedulerConfig, SyncState, SyncStateStore, SyncTrigger};
