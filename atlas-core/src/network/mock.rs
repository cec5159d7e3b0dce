//! Mock Transport
//!
//! In-memory implementation of the Transport trait for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::error::NetworkError;
use super::message::{InboundEvent, OutboundEvent};
use super::transport::{Transport, TransportConfig, TransportResult};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    /// Events that have been sent.
    sent: Vec<OutboundEvent>,
    /// Events to return on receive().
    receive_queue: VecDeque<InboundEvent>,
    /// Remaining connect attempts that fail.
    failing_connects: u32,
    connect_attempts: u32,
}

/// Mock transport for testing.
///
/// Clones share state: hand one clone to the connection and keep another
/// to inject inbound events and inspect what was sent.
///
/// # Example
///
/// ```ignore
/// use atlas_core::network::{InboundEvent, MockTransport};
///
/// let transport = MockTransport::new();
/// let handle = transport.clone();
/// // hand `transport` to a CloudConnection, then:
/// handle.queue_receive(InboundEvent::DeployPlaylist(serde_json::json!({})));
/// assert_eq!(handle.sent_messages()[0].name(), "register");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    notify: Arc<Notify>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` connect attempts fail.
    pub fn fail_connects(&self, n: u32) {
        self.lock().failing_connects = n;
    }

    /// Number of connect attempts so far, failed ones included.
    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    /// Queues an event to be returned by receive().
    pub fn queue_receive(&self, event: InboundEvent) {
        self.lock().receive_queue.push_back(event);
        self.notify.notify_one();
    }

    /// Returns all events that have been sent.
    pub fn sent_messages(&self) -> Vec<OutboundEvent> {
        self.lock().sent.clone()
    }

    /// Clears the sent events buffer.
    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// Simulates the server dropping the connection.
    pub fn drop_connection(&self) {
        self.lock().connected = false;
        self.notify.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self, _config: &TransportConfig) -> TransportResult<()> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(NetworkError::ConnectionFailed("injected failure".into()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> TransportResult<()> {
        self.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn send(&mut self, event: &OutboundEvent) -> TransportResult<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(NetworkError::NotConnected);
        }
        state.sent.push(event.clone());
        Ok(())
    }

    async fn receive(&mut self) -> TransportResult<InboundEvent> {
        loop {
            {
                let mut state = self.lock();
                if !state.connected {
                    return Err(NetworkError::ConnectionClosed);
                }
                if let Some(event) = state.receive_queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}
