// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use thiserror::Error;

/// Errors on the cloud control channel.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Could not establish the transport.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect did not finish in time, or the server stopped pinging.
    #[error("connection timed out")]
    Timeout,

    /// Operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A frame could not be decoded. Not fatal to the connection.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl From<serde_json::Error> for NetworkError {
    fn from(e: serde_json::Error) -> Self {
        NetworkError::InvalidMessage(e.to_string())
    }
}
