// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan-path configuration entities.
//!
//! A scan path binds a local directory to its arr-side counterpart and
//! carries the remediation policy for files underneath it. Rows are created
//! and mutated only through the administrative surface; the engine treats
//! them as read-mostly configuration.

use crate::health::DetectionConfig;
use serde::{Deserialize, Serialize};

/// Default remediation retry limit when a path does not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPath {
    pub id: i64,
    /// Root directory in the local filesystem namespace.
    pub local_path: String,
    /// The same directory in the arr manager's namespace.
    pub arr_path: String,
    pub enabled: bool,
    pub auto_remediate: bool,
    pub dry_run: bool,
    pub max_retries: u32,
    /// Overrides the engine-wide verification timeout when set.
    pub verification_timeout_hours: Option<u32>,
    pub detection: DetectionConfig,
}

impl ScanPath {
    /// Does `file_path` live under this scan path?
    ///
    /// The match must land on a path-component boundary: `/a/b` covers
    /// `/a/b/x.mkv` and `/a/b` itself, but never `/a/b2/x.mkv`.
    pub fn covers(&self, file_path: &str) -> bool {
        is_component_prefix(&self.local_path, file_path)
    }
}

/// True when `prefix` is a whole-component prefix of `path`.
pub fn is_component_prefix(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Pick the scan path with the longest `local_path` covering `file_path`.
pub fn longest_match<'a>(paths: &'a [ScanPath], file_path: &str) -> Option<&'a ScanPath> {
    paths
        .iter()
        .filter(|p| p.covers(file_path))
        .max_by_key(|p| p.local_path.trim_end_matches('/').len())
}

crate::builder! {
    pub struct ScanPathBuilder => ScanPath {
        into {
            local_path: String = "/media/library",
            arr_path: String = "/data/library",
        }
        set {
            id: i64 = 1,
            enabled: bool = true,
            auto_remediate: bool = true,
            dry_run: bool = false,
            max_retries: u32 = DEFAULT_MAX_RETRIES,
            detection: DetectionConfig = DetectionConfig::default(),
        }
        option {
            verification_timeout_hours: u32 = None,
        }
    }
}

#[cfg(test)]
#[path = "scan_path_tests.rs"]
mod tests;
