// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Diff between the server asset list and the manifest

use std::collections::HashSet;

use super::types::{Asset, Manifest};

/// What a cycle has to download and remove.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDiff<'a> {
    /// New or changed assets, in server order
    pub to_download: Vec<&'a Asset>,
    /// Manifest ids no longer in the playlist
    pub to_remove: Vec<String>,
}

impl AssetDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_remove.is_empty()
    }
}

/// Compare the server-declared assets against the manifest.
///
/// An asset is downloaded when it has no manifest entry, or when the server
/// declares a checksum different from the recorded one. Without a server
/// checksum an existing entry is trusted and never redownloaded. Duplicate
/// ids are passed through untouched.
pub fn diff_assets<'a>(server_assets: &'a [Asset], manifest: &Manifest) -> AssetDiff<'a> {
    let to_download = server_assets
        .iter()
        .filter(|asset| match manifest.get(&asset.id) {
            None => true,
            Some(cached) => asset
                .declared_checksum()
                .is_some_and(|declared| declared != cached.checksum),
        })
        .collect();

    let server_ids: HashSet<&str> = server_assets.iter().map(|a| a.id.as_str()).collect();
    let to_remove = manifest
        .keys()
        .filter(|id| !server_ids.contains(id.as_str()))
        .cloned()
        .collect();

    AssetDiff {
        to_download,
        to_remove,
    }
}
