// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `corruption_status` projection.
//!
//! A derived per-aggregate row maintained inside the same transaction as
//! every event append. It exists so the recovery service can find stale
//! in-progress items without replaying the whole log; it is a cache, and
//! [`Store::rebuild_corruption_status`] can always reconstruct it.

use crate::db::{from_us, to_us, Store};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use remedarr_core::corruption::{CorruptionState, CorruptionStatus};
use remedarr_core::event::EventRecord;
use remedarr_core::id::CorruptionId;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use std::time::Duration;

const STATUS_COLUMNS: &str =
    "corruption_id, current_state, file_path, path_id, media_id, retry_count, last_updated_at";

/// Fold a freshly appended event into the projection, inside the append
/// transaction.
pub(crate) fn apply_in_tx(tx: &Transaction<'_>, record: &EventRecord) -> Result<(), StoreError> {
    let existing = tx
        .query_row(
            &format!(
                "SELECT {STATUS_COLUMNS} FROM corruption_status WHERE corruption_id = ?1"
            ),
            [record.aggregate_id.as_str()],
            map_status_row,
        )
        .optional()?;

    let status = match existing {
        Some(mut status) => {
            status.apply(record);
            status
        }
        None => match CorruptionStatus::from_first_event(record) {
            Some(status) => status,
            // Non-detection event on an unknown aggregate; nothing to track.
            None => return Ok(()),
        },
    };

    upsert(tx, &status)?;
    Ok(())
}

fn upsert(tx: &Transaction<'_>, status: &CorruptionStatus) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO corruption_status
             (corruption_id, current_state, file_path, path_id, media_id,
              retry_count, last_updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(corruption_id) DO UPDATE SET
             current_state = excluded.current_state,
             file_path = excluded.file_path,
             path_id = excluded.path_id,
             media_id = excluded.media_id,
             retry_count = excluded.retry_count,
             last_updated_at = excluded.last_updated_at",
        params![
            status.corruption_id.as_str(),
            status.current_state.to_string(),
            status.file_path,
            status.path_id,
            status.media_id,
            status.retry_count,
            to_us(status.last_updated_at),
        ],
    )?;
    Ok(())
}

fn map_status_row(row: &Row<'_>) -> rusqlite::Result<CorruptionStatus> {
    let state: String = row.get(1)?;
    let updated: i64 = row.get(6)?;
    Ok(CorruptionStatus {
        corruption_id: CorruptionId::from_string(row.get::<_, String>(0)?),
        current_state: CorruptionState::parse(&state).unwrap_or(CorruptionState::Detected),
        file_path: row.get(2)?,
        path_id: row.get(3)?,
        media_id: row.get(4)?,
        retry_count: row.get(5)?,
        last_updated_at: from_us(updated),
    })
}

impl Store {
    /// Current projection row for an aggregate.
    pub fn corruption_status(
        &self,
        corruption_id: &str,
    ) -> Result<Option<CorruptionStatus>, StoreError> {
        self.read(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {STATUS_COLUMNS} FROM corruption_status
                         WHERE corruption_id = ?1"
                    ),
                    [corruption_id],
                    map_status_row,
                )
                .optional()?)
        })
    }

    /// Projection rows stuck in an in-progress state for longer than
    /// `threshold`.
    pub fn stale_corruptions(
        &self,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<CorruptionStatus>, StoreError> {
        let cutoff = to_us(now) - threshold.as_micros() as i64;
        let stale_states: Vec<String> = all_states()
            .into_iter()
            .filter(|s| s.stale_class().is_some())
            .map(|s| format!("'{s}'"))
            .collect();
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STATUS_COLUMNS} FROM corruption_status
                 WHERE last_updated_at < ?1 AND current_state IN ({})
                 ORDER BY last_updated_at",
                stale_states.join(", ")
            ))?;
            let rows = stmt.query_map([cutoff], map_status_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Drop and rebuild the whole projection by replaying the log.
    /// Returns the number of aggregates rebuilt.
    pub fn rebuild_corruption_status(&self) -> Result<usize, StoreError> {
        let ids = self.corruption_aggregate_ids()?;
        let mut statuses = Vec::new();
        for id in &ids {
            let records = self.events_for_aggregate(id)?;
            if let Some(status) = CorruptionStatus::replay(records.iter()) {
                statuses.push(status);
            }
        }

        self.write(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM corruption_status", [])?;
            for status in &statuses {
                upsert(&tx, status)?;
            }
            tx.commit()?;
            Ok(statuses.len())
        })
    }
}

fn all_states() -> Vec<CorruptionState> {
    use CorruptionState::*;
    vec![
        Detected,
        RemediationQueued,
        DeletionStarted,
        DeletionCompleted,
        DeletionFailed,
        SearchStarted,
        SearchCompleted,
        SearchFailed,
        SearchExhausted,
        DownloadProgress,
        DownloadFailed,
        DownloadTimeout,
        DownloadIgnored,
        ManuallyRemoved,
        ImportBlocked,
        FileDetected,
        VerificationStarted,
        VerificationSuccess,
        VerificationFailed,
        RetryScheduled,
        MaxRetriesReached,
    ]
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
