// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-rescan queue.

use crate::db::{from_us, to_us, Store};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use remedarr_core::health::{HealthCheckError, HealthErrorKind};
use remedarr_core::rescan::{PendingRescan, RescanResolution, RescanStatus};
use rusqlite::{params, OptionalExtension, Row};

const RESCAN_COLUMNS: &str = "id, file_path, path_id, error_type, error_message, retry_count, \
     max_retries, next_retry_at, status, resolution";

fn map_rescan_row(row: &Row<'_>) -> rusqlite::Result<PendingRescan> {
    let error_type: String = row.get(3)?;
    let status: String = row.get(8)?;
    let resolution: Option<String> = row.get(9)?;
    let next_retry: i64 = row.get(7)?;
    Ok(PendingRescan {
        id: row.get(0)?,
        file_path: row.get(1)?,
        path_id: row.get(2)?,
        error_type: HealthErrorKind::parse(&error_type),
        error_message: row.get(4)?,
        retry_count: row.get(5)?,
        max_retries: row.get(6)?,
        next_retry_at: from_us(next_retry),
        status: RescanStatus::parse(&status).unwrap_or(RescanStatus::Pending),
        resolution: resolution.and_then(|r| RescanResolution::parse(&r)),
    })
}

impl Store {
    /// Queue (or re-queue) a file for later reinspection. An existing row
    /// for the same path is refreshed in place, keeping its retry count.
    pub fn upsert_pending_rescan(
        &self,
        file_path: &str,
        path_id: i64,
        error: &HealthCheckError,
        next_retry_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            conn.execute(
                "INSERT INTO pending_rescans
                     (file_path, path_id, error_type, error_message,
                      next_retry_at, max_retries, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')
                 ON CONFLICT(file_path) DO UPDATE SET
                     path_id = excluded.path_id,
                     error_type = excluded.error_type,
                     error_message = excluded.error_message,
                     next_retry_at = excluded.next_retry_at,
                     status = 'pending',
                     resolution = NULL",
                params![
                    file_path,
                    path_id,
                    error.kind.to_string(),
                    error.message,
                    to_us(next_retry_at),
                    max_retries,
                ],
            )?;
            Ok(())
        })
    }

    /// The next batch of due rescans, oldest deadline first.
    pub fn due_rescans(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PendingRescan>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RESCAN_COLUMNS} FROM pending_rescans
                 WHERE status = 'pending'
                   AND next_retry_at <= ?1
                   AND retry_count < max_retries
                 ORDER BY next_retry_at
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![to_us(now), limit as i64], map_rescan_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn pending_rescan_for_path(
        &self,
        file_path: &str,
    ) -> Result<Option<PendingRescan>, StoreError> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {RESCAN_COLUMNS} FROM pending_rescans WHERE file_path = ?1"),
                    [file_path],
                    map_rescan_row,
                )
                .optional()?)
        })
    }

    pub fn mark_rescan_resolved(
        &self,
        id: i64,
        resolution: RescanResolution,
    ) -> Result<(), StoreError> {
        let status = match resolution {
            RescanResolution::Abandoned => RescanStatus::Abandoned,
            _ => RescanStatus::Resolved,
        };
        self.write(|conn| {
            conn.execute(
                "UPDATE pending_rescans SET status = ?2, resolution = ?3 WHERE id = ?1",
                params![id, status.to_string(), resolution.to_string()],
            )?;
            Ok(())
        })
    }

    /// Record one more failed reinspection and push out the deadline; marks
    /// the row abandoned once the new count reaches the limit.
    pub fn bump_rescan_retry(
        &self,
        id: i64,
        new_retry_count: u32,
        next_retry_at: DateTime<Utc>,
        abandoned: bool,
    ) -> Result<(), StoreError> {
        self.write(|conn| {
            if abandoned {
                conn.execute(
                    "UPDATE pending_rescans
                     SET retry_count = ?2, status = 'abandoned', resolution = 'abandoned'
                     WHERE id = ?1",
                    params![id, new_retry_count],
                )?;
            } else {
                conn.execute(
                    "UPDATE pending_rescans
                     SET retry_count = ?2, next_retry_at = ?3
                     WHERE id = ?1",
                    params![id, new_retry_count, to_us(next_retry_at)],
                )?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "rescans_tests.rs"]
mod tests;
