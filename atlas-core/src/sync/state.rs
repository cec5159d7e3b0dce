// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persisted Sync State
//!
//! Small JSON record of the agent's view of the world: last completed sync,
//! connectivity and the assigned player id. It is written on registration,
//! on disconnect and after each cycle, and read back at start so a
//! restarted agent knows its player id before the cloud answers.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::cache::atomic_write;

/// Agent-level sync bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_online: bool,
    pub player_id: Option<String>,
    /// Set while a cycle runs in this process. Never persisted.
    #[serde(skip)]
    pub sync_in_progress: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Errors reading or writing the sync state file.
#[derive(Debug, Error)]
pub enum SyncStateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory sync state backed by a JSON file.
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    state: Mutex<SyncState>,
    write: tokio::sync::Mutex<()>,
}

impl SyncStateStore {
    /// Loads the state file. A missing or unreadable file yields the
    /// default state.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_state(&path).await {
            Ok(Some(state)) => state,
            Ok(None) => SyncState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable sync state");
                SyncState::default()
            }
        };
        Self::with_state(path, state)
    }

    /// Store starting from `state`, nothing read from disk.
    pub fn with_state(path: impl Into<PathBuf>, state: SyncState) -> Self {
        SyncStateStore {
            path: path.into(),
            state: Mutex::new(state),
            write: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SyncState {
        self.lock().clone()
    }

    /// Applies `f`, stamps `updated_at` and writes the file.
    ///
    /// Write failures are logged and otherwise ignored.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SyncState),
    {
        {
            let mut state = self.lock();
            f(&mut state);
            state.updated_at = Some(Utc::now());
        }
        if let Err(e) = self.persist().await {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to save sync state");
        }
    }

    /// Marks a cycle as running. Returns `None` if one already is.
    pub fn begin_sync(&self) -> Option<SyncInProgress<'_>> {
        let mut state = self.lock();
        if state.sync_in_progress {
            return None;
        }
        state.sync_in_progress = true;
        Some(SyncInProgress { store: self })
    }

    /// Writes the current state to disk.
    pub async fn persist(&self) -> Result<(), SyncStateError> {
        // Serialize writers so an older snapshot never lands last
        let _write = self.write.lock().await;
        let data = serde_json::to_vec_pretty(&self.snapshot())?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        atomic_write(&self.path, &data).await?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the in-progress flag when dropped.
#[derive(Debug)]
pub struct SyncInProgress<'a> {
    store: &'a SyncStateStore,
}

impl Drop for SyncInProgress<'_> {
    fn drop(&mut self) {
        self.store.lock().sync_in_progress = false;
    }
}

async fn read_state(path: &Path) -> Result<Option<SyncState>, SyncStateError> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
