//! Event System
//!
//! Notifications for the renderer and other embedders of the agent.

use std::sync::{Arc, RwLock};

use crate::cache::SyncOutcome;
use crate::network::ConnectionState;

/// Events emitted by the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Cached content changed; the renderer should reload.
    ContentReady {
        /// Assets downloaded in the cycle.
        downloaded: usize,
        /// Assets removed in the cycle.
        removed: usize,
    },

    /// Cloud connection state changed.
    ConnectionStateChanged {
        /// The new connection state.
        state: ConnectionState,
    },

    /// A sync cycle finished (skipped cycles included).
    SyncCompleted {
        /// The cycle outcome.
        outcome: SyncOutcome,
    },

    /// A sync cycle aborted.
    SyncFailed {
        /// Error description.
        error: String,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive agent events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: AgentEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(AgentEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(AgentEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(AgentEvent) + Send + Sync,
{
    fn on_event(&self, event: AgentEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
///
/// Handlers can be added while the agent runs, so the list sits behind a
/// lock and every method takes `&self`.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event handler.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&self) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: AgentEvent) {
        // Clone the list so handlers may add handlers
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for handler in &handlers {
            handler.on_event(event.clone());
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
