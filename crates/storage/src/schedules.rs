// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan-schedule rows.

use crate::db::Store;
use crate::error::StoreError;
use remedarr_core::schedule::ScanSchedule;
use rusqlite::{params, OptionalExtension, Row};

fn map_schedule_row(row: &Row<'_>) -> rusqlite::Result<ScanSchedule> {
    Ok(ScanSchedule {
        id: row.get(0)?,
        scan_path_id: row.get(1)?,
        cron_expression: row.get(2)?,
        enabled: row.get(3)?,
    })
}

impl Store {
    pub fn insert_schedule(
        &self,
        scan_path_id: i64,
        cron_expression: &str,
        enabled: bool,
    ) -> Result<i64, StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO scan_schedules (scan_path_id, cron_expression, enabled)
                 VALUES (?1, ?2, ?3)",
                params![scan_path_id, cron_expression, enabled],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_schedule(
        &self,
        id: i64,
        cron_expression: &str,
        enabled: bool,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "UPDATE scan_schedules SET cron_expression = ?2, enabled = ?3 WHERE id = ?1",
                params![id, cron_expression, enabled],
            )?;
            Ok(())
        })
    }

    pub fn delete_schedule(&self, id: i64) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute("DELETE FROM scan_schedules WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn schedule(&self, id: i64) -> Result<Option<ScanSchedule>, StoreError> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, scan_path_id, cron_expression, enabled
                     FROM scan_schedules WHERE id = ?1",
                    [id],
                    map_schedule_row,
                )
                .optional()?)
        })
    }

    pub fn enabled_schedules(&self) -> Result<Vec<ScanSchedule>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, scan_path_id, cron_expression, enabled
                 FROM scan_schedules WHERE enabled = 1 ORDER BY id",
            )?;
            let rows = stmt.query_map([], map_schedule_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Delete schedules whose scan path no longer exists.
    /// Returns the ids removed so the scheduler can drop their timers.
    pub fn delete_orphaned_schedules(&self) -> Result<Vec<i64>, StoreError> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let orphans: Vec<i64> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM scan_schedules
                     WHERE scan_path_id NOT IN (SELECT id FROM scan_paths)",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };
            for id in &orphans {
                tx.execute("DELETE FROM scan_schedules WHERE id = ?1", [id])?;
            }
            tx.commit()?;
            Ok(orphans)
        })
    }
}

#[cfg(test)]
#[path = "schedules_tests.rs"]
mod tests;
