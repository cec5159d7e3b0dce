// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache lock
//!
//! A lock record file guards the whole cache tree while a sync cycle runs.
//! Presence plus file age is the only synchronization primitive: a record
//! older than the staleness threshold belongs to a crashed cycle and may be
//! overridden, so the cache heals itself without manual intervention.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::config::LOCK_STALE_AFTER;
use super::error::CacheError;
use super::types::LockRecord;

/// Mutual exclusion over the cache tree, backed by a lock file.
#[derive(Debug, Clone)]
pub struct LockManager {
    path: PathBuf,
    stale_after: Duration,
}

impl LockManager {
    /// Create a lock manager using the default 10 minute staleness threshold.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stale_after: LOCK_STALE_AFTER,
        }
    }

    /// Use a different staleness threshold.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock.
    ///
    /// Returns `false` if a fresh record exists: another cycle is running and
    /// the caller must skip, not wait. A stale record is overwritten.
    pub async fn acquire(&self) -> Result<bool, CacheError> {
        let record = serde_json::to_vec(&LockRecord {
            pid: std::process::id(),
            timestamp: Utc::now(),
        })?;

        match write_new(&self.path, &record).await {
            Ok(()) => return Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }

        let age = match self.age().await {
            Ok(age) => age,
            // Released between our create and stat: take it
            Err(e) if e.kind() == ErrorKind::NotFound => Duration::MAX,
            Err(e) => return Err(e.into()),
        };

        if age < self.stale_after {
            tracing::info!(age_secs = age.as_secs(), "lock held by another cycle, skipping");
            return Ok(false);
        }

        tracing::warn!(age_secs = age.as_secs(), "stale lock detected, overriding");
        fs::write(&self.path, &record).await?;
        Ok(true)
    }

    /// Take the lock and return a guard that releases it when dropped.
    pub async fn try_lock(&self) -> Result<Option<LockGuard>, CacheError> {
        if self.acquire().await? {
            Ok(Some(LockGuard {
                path: self.path.clone(),
                released: false,
            }))
        } else {
            Ok(None)
        }
    }

    /// Delete the lock record. Safe to call when no lock is held.
    pub async fn release(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The current lock record, if one exists and parses.
    pub async fn holder(&self) -> Option<LockRecord> {
        let data = fs::read(&self.path).await.ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Returns true if a lock record exists, fresh or not.
    pub async fn is_locked(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn age(&self) -> io::Result<Duration> {
        let modified = fs::metadata(&self.path).await?.modified()?;
        // A record from the future counts as fresh
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default())
    }
}

/// Held lock. Releases the lock file on drop, on every exit path.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Release the lock now.
    pub async fn release(mut self) -> Result<(), CacheError> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Only reached when a cycle is aborted or its future is dropped; normal
// cycles go through `release`.
impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Create `path` exclusively and write `data` to it.
async fn write_new(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await
}
