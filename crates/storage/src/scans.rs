// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan execution records and per-file audit rows.

use crate::db::{from_us, to_us, Store};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use remedarr_core::health::DetectionConfig;
use remedarr_core::scan::{Scan, ScanFileRecord, ScanStatus};
use rusqlite::{params, OptionalExtension, Row};

/// Inputs for a new scan row. The file list and detection config are
/// snapshotted so an interrupted scan resumes against the same inputs.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub path: String,
    pub path_id: i64,
    pub file_list: Vec<String>,
    pub detection: DetectionConfig,
    pub auto_remediate: bool,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
}

const SCAN_COLUMNS: &str = "id, path, path_id, status, total_files, files_scanned, \
     current_file_index, file_list, detection_config, auto_remediate, dry_run, \
     started_at, completed_at";

fn map_scan_row(row: &Row<'_>) -> rusqlite::Result<(Scan, String, String)> {
    let status: String = row.get(3)?;
    let file_list: String = row.get(7)?;
    let detection: String = row.get(8)?;
    let started: i64 = row.get(11)?;
    let completed: Option<i64> = row.get(12)?;
    Ok((
        Scan {
            id: row.get(0)?,
            path: row.get(1)?,
            path_id: row.get(2)?,
            status: ScanStatus::parse(&status).unwrap_or(ScanStatus::Interrupted),
            total_files: row.get::<_, i64>(4)? as usize,
            files_scanned: row.get::<_, i64>(5)? as usize,
            current_file_index: row.get::<_, i64>(6)? as usize,
            file_list: Vec::new(),
            detection: DetectionConfig::default(),
            auto_remediate: row.get(9)?,
            dry_run: row.get(10)?,
            started_at: from_us(started),
            completed_at: completed.map(from_us),
        },
        file_list,
        detection,
    ))
}

fn decode_scan(parts: (Scan, String, String)) -> Result<Scan, StoreError> {
    let (mut scan, file_list, detection) = parts;
    scan.file_list = serde_json::from_str(&file_list)?;
    scan.detection = serde_json::from_str(&detection)?;
    Ok(scan)
}

impl Store {
    /// Insert a scan in `running` state, returning its id.
    pub fn create_scan(&self, new: &NewScan) -> Result<i64, StoreError> {
        let file_list = serde_json::to_string(&new.file_list)?;
        let detection = serde_json::to_string(&new.detection)?;
        self.write(|conn| {
            conn.execute(
                "INSERT INTO scans
                     (path, path_id, status, total_files, file_list, detection_config,
                      auto_remediate, dry_run, started_at)
                 VALUES (?1, ?2, 'running', ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new.path,
                    new.path_id,
                    new.file_list.len() as i64,
                    file_list,
                    detection,
                    new.auto_remediate,
                    new.dry_run,
                    to_us(new.started_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn scan(&self, id: i64) -> Result<Option<Scan>, StoreError> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?1"),
                [id],
                map_scan_row,
            )
            .optional()?
            .map(decode_scan)
            .transpose()
        })
    }

    /// Progress checkpoint, written every few files and on the final file.
    pub fn update_scan_progress(
        &self,
        id: i64,
        current_file_index: usize,
        files_scanned: usize,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            let changed = conn.execute(
                "UPDATE scans SET current_file_index = ?2, files_scanned = ?3 WHERE id = ?1",
                params![id, current_file_index as i64, files_scanned as i64],
            )?;
            if changed == 0 {
                return Err(StoreError::ScanNotFound(id));
            }
            Ok(())
        })
    }

    pub fn set_scan_status(
        &self,
        id: i64,
        status: ScanStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            let changed = conn.execute(
                "UPDATE scans SET status = ?2, completed_at = ?3 WHERE id = ?1",
                params![id, status.to_string(), completed_at.map(to_us)],
            )?;
            if changed == 0 {
                return Err(StoreError::ScanNotFound(id));
            }
            Ok(())
        })
    }

    /// Scans saved as `interrupted` at the last shutdown.
    pub fn interrupted_scans(&self) -> Result<Vec<Scan>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCAN_COLUMNS} FROM scans
                 WHERE status = 'interrupted' ORDER BY id"
            ))?;
            let rows = stmt.query_map([], map_scan_row)?;
            let mut scans = Vec::new();
            for row in rows {
                scans.push(decode_scan(row?)?);
            }
            Ok(scans)
        })
    }

    /// Per-file audit row.
    pub fn record_scan_file(&self, rec: &ScanFileRecord) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO scan_files
                     (scan_id, file_path, status, corruption_type, error_details, file_size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    rec.scan_id,
                    rec.file_path,
                    rec.status.to_string(),
                    rec.corruption_type.map(|k| k.to_string()),
                    rec.error_details,
                    rec.file_size,
                ],
            )?;
            Ok(())
        })
    }

    /// Audit rows for one scan, insertion-ordered.
    pub fn scan_files(&self, scan_id: i64) -> Result<Vec<ScanFileRecord>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT scan_id, file_path, status, corruption_type, error_details, file_size
                 FROM scan_files WHERE scan_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map([scan_id], |row| {
                let status: String = row.get(2)?;
                let corruption: Option<String> = row.get(3)?;
                Ok(ScanFileRecord {
                    scan_id: row.get(0)?,
                    file_path: row.get(1)?,
                    status: remedarr_core::scan::ScanFileStatus::parse(&status)
                        .unwrap_or(remedarr_core::scan::ScanFileStatus::Skipped),
                    corruption_type: corruption
                        .map(|c| remedarr_core::health::HealthErrorKind::parse(&c)),
                    error_details: row.get(4)?,
                    file_size: row.get(5)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
#[path = "scans_tests.rs"]
mod tests;
