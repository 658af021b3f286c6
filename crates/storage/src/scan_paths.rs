// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan-path configuration rows.

use crate::db::Store;
use crate::error::StoreError;
use remedarr_core::health::DetectionConfig;
use remedarr_core::scan_path::{self, ScanPath};
use rusqlite::{params, OptionalExtension, Row};

const PATH_COLUMNS: &str = "id, local_path, arr_path, enabled, auto_remediate, dry_run, \
     max_retries, verification_timeout_hours, detection_config";

fn map_path_row(row: &Row<'_>) -> rusqlite::Result<(ScanPath, String)> {
    let detection: String = row.get(8)?;
    Ok((
        ScanPath {
            id: row.get(0)?,
            local_path: row.get(1)?,
            arr_path: row.get(2)?,
            enabled: row.get(3)?,
            auto_remediate: row.get(4)?,
            dry_run: row.get(5)?,
            max_retries: row.get(6)?,
            verification_timeout_hours: row.get(7)?,
            detection: DetectionConfig::default(),
        },
        detection,
    ))
}

fn decode_path(parts: (ScanPath, String)) -> Result<ScanPath, StoreError> {
    let (mut path, detection) = parts;
    path.detection = serde_json::from_str(&detection)?;
    Ok(path)
}

impl Store {
    /// Insert a scan path, returning its id.
    pub fn insert_scan_path(&self, path: &ScanPath) -> Result<i64, StoreError> {
        let detection = serde_json::to_string(&path.detection)?;
        self.write(|conn| {
            conn.execute(
                "INSERT INTO scan_paths
                     (local_path, arr_path, enabled, auto_remediate, dry_run,
                      max_retries, verification_timeout_hours, detection_config)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    path.local_path,
                    path.arr_path,
                    path.enabled,
                    path.auto_remediate,
                    path.dry_run,
                    path.max_retries,
                    path.verification_timeout_hours,
                    detection,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn scan_path(&self, id: i64) -> Result<Option<ScanPath>, StoreError> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {PATH_COLUMNS} FROM scan_paths WHERE id = ?1"),
                [id],
                map_path_row,
            )
            .optional()?
            .map(decode_path)
            .transpose()
        })
    }

    /// All enabled scan paths.
    pub fn enabled_scan_paths(&self) -> Result<Vec<ScanPath>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PATH_COLUMNS} FROM scan_paths WHERE enabled = 1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([], map_path_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(decode_path(row?)?);
            }
            Ok(out)
        })
    }

    /// The enabled scan path owning `file_path`, by longest local-path
    /// component prefix.
    pub fn scan_path_for_file(&self, file_path: &str) -> Result<Option<ScanPath>, StoreError> {
        let paths = self.enabled_scan_paths()?;
        Ok(scan_path::longest_match(&paths, file_path).cloned())
    }
}

#[cfg(test)]
#[path = "scan_paths_tests.rs"]
mod tests;
