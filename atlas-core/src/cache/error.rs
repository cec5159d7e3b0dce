// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache error types

use std::io;

use thiserror::Error;

use super::fetcher::FetchError;
use super::integrity::IntegrityError;

/// Errors that abort a cache operation
///
/// Per-asset download problems never surface here; they are counted as
/// failures in the cycle outcome instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Cloud API request failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Integrity verification could not run
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),
}
