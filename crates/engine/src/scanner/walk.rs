// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory enumeration for scans.

use remedarr_core::media::is_eligible_media_file;
use std::path::Path;
use walkdir::WalkDir;

/// Collect every eligible media file under `root`, sorted for stable
/// resumable file lists.
pub(crate) fn enumerate_media_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_eligible_media_file(entry.path()))
        .map(|entry| entry.path().display().to_string())
        .collect();
    files.sort();
    files
}
