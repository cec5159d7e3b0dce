//! Cloud Control Channel
//!
//! Persistent, bidirectional link between the player and the cloud.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **Framing**: Engine.IO v4 packets carrying Socket.IO v5 events on the
//!   default namespace
//! - **Message types**: typed events for both directions
//! - **Transport trait**: interface over the actual channel, implemented by
//!   WebSocket, long-polling and an in-memory mock
//! - **Cloud connection**: reconnect loop, registration and event routing
//! - **Session**: shared connection state and the best-effort send queue
//!
//! # Example
//!
//! ```ignore
//! use atlas_core::network::{CloudConnection, Session, TransportConfig};
//!
//! let (session, outbound) = Session::new(None);
//! let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
//! let connection = CloudConnection::new(config, registration, session.clone(), outbound, events_tx)
//!     .with_default_transports();
//! tokio::spawn(connection.run(shutdown.clone()));
//! ```

mod connection;
mod engineio;
mod error;
mod message;
mod mock;
mod polling;
mod socketio;
mod transport;
mod websocket;

// Error types
pub use error::NetworkError;

// Wire framing
pub use engineio::{
    decode_payload, encode_payload, engine_url, EnginePacket, EngineTransport, Handshake,
    PROTOCOL_VERSION,
};
pub use socketio::SocketPacket;

// Message types
pub use message::{
    InboundEvent, OutboundEvent, PlayerInfo, Registration, ReportStatus, SyncStatusReport,
};

// Transport abstraction
pub use transport::{Backoff, ConnectionState, Transport, TransportConfig, TransportResult};

// Mock transport for testing
pub use mock::MockTransport;

// Production transports
pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

// Connection management
pub use connection::{CloudConnection, ConnectionEvent, OutboundQueue, Session};
