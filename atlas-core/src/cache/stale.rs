// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Stale area
//!
//! Files displaced by a swap or dropped from the playlist are parked here
//! instead of being deleted. Only the age-based sweep removes them.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;

/// Default maximum age of stale files before the sweep deletes them.
pub const DEFAULT_STALE_MAX_AGE_DAYS: u64 = 7;

/// Move a cached file into the stale area.
///
/// The file's mtime is reset so its stale age counts from now. Returns
/// `Ok(false)` if the source no longer exists.
pub async fn move_to_stale(src: &Path, dest: &Path) -> io::Result<bool> {
    match fs::rename(src, dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    if let Err(e) = touch(dest).await {
        tracing::debug!(path = %dest.display(), error = %e, "could not reset stale mtime");
    }
    Ok(true)
}

/// Delete stale files older than `max_age_days`. Returns how many went.
pub async fn clean_stale(stale_dir: &Path, max_age_days: u64) -> io::Result<usize> {
    let max_age = Duration::from_secs(max_age_days.saturating_mul(24 * 60 * 60));
    let mut entries = match fs::read_dir(stale_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut cleaned = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let age = now
            .duration_since(metadata.modified()?)
            .unwrap_or_default();
        if age > max_age {
            fs::remove_file(entry.path()).await?;
            cleaned += 1;
        }
    }

    if cleaned > 0 {
        tracing::info!(cleaned, "cleaned stale files");
    }
    Ok(cleaned)
}

async fn touch(path: &Path) -> io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path).await?;
    file.into_std().await.set_modified(SystemTime::now())
}
