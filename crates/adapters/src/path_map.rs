// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local ↔ arr namespace path translation.
//!
//! Purely functional over the scan-path table: each scan path contributes a
//! `(local_path, arr_path)` pair and translation swaps the longest matching
//! whole-component prefix. `reload` swaps in a fresh table when scan paths
//! change.

use crate::AdapterError;
use parking_lot::RwLock;
use remedarr_core::scan_path::{is_component_prefix, ScanPath};

#[derive(Debug, Clone)]
struct MapEntry {
    local: String,
    arr: String,
}

/// Translator between the local filesystem namespace and the arr's.
pub struct PathMapper {
    entries: RwLock<Vec<MapEntry>>,
}

impl PathMapper {
    pub fn new(paths: &[ScanPath]) -> Self {
        let mapper = Self { entries: RwLock::new(Vec::new()) };
        mapper.reload(paths);
        mapper
    }

    /// Replace the mapping table.
    pub fn reload(&self, paths: &[ScanPath]) {
        let mut entries: Vec<MapEntry> = paths
            .iter()
            .map(|p| MapEntry {
                local: p.local_path.trim_end_matches('/').to_string(),
                arr: p.arr_path.trim_end_matches('/').to_string(),
            })
            .collect();
        // Longest prefix first so the first match wins.
        entries.sort_by_key(|e| std::cmp::Reverse(e.local.len()));
        *self.entries.write() = entries;
    }

    /// Translate a local path into the arr namespace.
    pub fn to_arr_path(&self, local_path: &str) -> Result<String, AdapterError> {
        let entries = self.entries.read();
        for entry in entries.iter() {
            if is_component_prefix(&entry.local, local_path) {
                return Ok(swap_prefix(local_path, &entry.local, &entry.arr));
            }
        }
        Err(AdapterError::NoMapping(local_path.to_string()))
    }

    /// Translate an arr-namespace path into the local namespace.
    pub fn to_local_path(&self, arr_path: &str) -> Result<String, AdapterError> {
        let entries = self.entries.read();
        let mut best: Option<&MapEntry> = None;
        for entry in entries.iter() {
            if is_component_prefix(&entry.arr, arr_path)
                && best.map(|b| entry.arr.len() > b.arr.len()).unwrap_or(true)
            {
                best = Some(entry);
            }
        }
        match best {
            Some(entry) => Ok(swap_prefix(arr_path, &entry.arr, &entry.local)),
            None => Err(AdapterError::NoMapping(arr_path.to_string())),
        }
    }
}

fn swap_prefix(path: &str, from: &str, to: &str) -> String {
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

#[cfg(test)]
#[path = "path_map_tests.rs"]
mod tests;
