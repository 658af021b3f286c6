// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event log.
//!
//! `append_event` computes the next `event_version`, clamps `created_at`
//! so it strictly increases per aggregate, writes the row, and updates the
//! `corruption_status` projection, all in one transaction. A subscriber
//! can therefore never observe an event that is not durable, and replaying
//! an aggregate always yields a single monotone trace.

use crate::db::{from_us, to_us, Store};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use remedarr_core::event::{AggregateType, Event, EventKind, EventRecord, FAILURE_KINDS};
use rusqlite::{params, OptionalExtension, Row};
use std::time::Duration;

const EVENT_COLUMNS: &str =
    "id, aggregate_type, aggregate_id, event_type, event_data, event_version, created_at, user_id";

impl Store {
    /// Append an event, returning the stored record.
    pub fn append_event(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        event: &Event,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<EventRecord, StoreError> {
        let event_data = serde_json::to_string(event)?;
        let kind = event.kind();
        self.write(|conn| {
            let tx = conn.transaction()?;

            let (max_version, max_created): (i64, Option<i64>) = tx.query_row(
                "SELECT COALESCE(MAX(event_version), 0), MAX(created_at)
                 FROM events WHERE aggregate_id = ?1",
                [aggregate_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let version = max_version + 1;

            if version == 1
                && aggregate_type == AggregateType::Corruption
                && kind != EventKind::CorruptionDetected
            {
                return Err(StoreError::FirstEventNotDetection(aggregate_id.to_string()));
            }

            // created_at must strictly increase per aggregate even when the
            // wall clock stalls or steps backwards.
            let mut created_us = to_us(now);
            if let Some(prev) = max_created {
                if created_us <= prev {
                    created_us = prev + 1;
                }
            }

            tx.execute(
                "INSERT INTO events
                     (aggregate_type, aggregate_id, event_type, event_data,
                      event_version, created_at, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    aggregate_type.to_string(),
                    aggregate_id,
                    kind.as_str(),
                    event_data,
                    version,
                    created_us,
                    user_id,
                ],
            )?;

            let record = EventRecord {
                id: tx.last_insert_rowid(),
                aggregate_type,
                aggregate_id: aggregate_id.to_string(),
                event: event.clone(),
                event_version: version,
                created_at: from_us(created_us),
                user_id: user_id.map(String::from),
            };

            if aggregate_type == AggregateType::Corruption {
                crate::projection::apply_in_tx(&tx, &record)?;
            }

            tx.commit()?;
            Ok(record)
        })
    }

    /// All events of an aggregate in version order.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Result<Vec<EventRecord>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE aggregate_id = ?1 ORDER BY event_version"
            ))?;
            let rows = stmt.query_map([aggregate_id], map_event_row)?;
            collect_records(rows)
        })
    }

    /// The most recent event of an aggregate, if any.
    pub fn last_event_for_aggregate(
        &self,
        aggregate_id: &str,
    ) -> Result<Option<EventRecord>, StoreError> {
        self.read(|conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM events
                         WHERE aggregate_id = ?1
                         ORDER BY event_version DESC LIMIT 1"
                    ),
                    [aggregate_id],
                    map_event_row,
                )
                .optional()?;
            decode_optional(record)
        })
    }

    /// When the aggregate's first event was recorded.
    pub fn first_event_at(&self, aggregate_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.read(|conn| {
            let us: Option<i64> = conn
                .query_row(
                    "SELECT created_at FROM events
                     WHERE aggregate_id = ?1 AND event_version = 1",
                    [aggregate_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(us.map(from_us))
        })
    }

    /// Deduplication query: the most recent `CorruptionDetected` for
    /// `file_path` within `window` whose aggregate has seen neither a
    /// `VerificationSuccess` nor a `MaxRetriesReached`.
    pub fn recent_open_detection(
        &self,
        file_path: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<EventRecord>, StoreError> {
        let since = to_us(now) - window.as_micros() as i64;
        self.read(|conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM events e
                         WHERE e.event_type = 'corruption:detected'
                           AND e.created_at >= ?1
                           AND json_extract(e.event_data, '$.file_path') = ?2
                           AND NOT EXISTS (
                               SELECT 1 FROM events t
                               WHERE t.aggregate_id = e.aggregate_id
                                 AND t.event_type IN
                                     ('verification:success', 'retry:max_reached')
                           )
                         ORDER BY e.created_at DESC LIMIT 1"
                    ),
                    params![since, file_path],
                    map_event_row,
                )
                .optional()?;
            decode_optional(record)
        })
    }

    /// Number of failure events recorded on an aggregate.
    pub fn count_failure_events(&self, aggregate_id: &str) -> Result<u32, StoreError> {
        let placeholders: Vec<String> =
            FAILURE_KINDS.iter().map(|k| format!("'{}'", k.as_str())).collect();
        self.read(|conn| {
            let count: u32 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM events
                     WHERE aggregate_id = ?1 AND event_type IN ({})",
                    placeholders.join(", ")
                ),
                [aggregate_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// The latest `DeletionCompleted` on an aggregate, if any. Used by the
    /// remediator to skip re-deletion on retries.
    pub fn prior_deletion_completed(
        &self,
        aggregate_id: &str,
    ) -> Result<Option<EventRecord>, StoreError> {
        self.read(|conn| {
            let record = conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM events
                         WHERE aggregate_id = ?1 AND event_type = 'deletion:completed'
                         ORDER BY event_version DESC LIMIT 1"
                    ),
                    [aggregate_id],
                    map_event_row,
                )
                .optional()?;
            decode_optional(record)
        })
    }

    /// Every corruption aggregate id, in first-appearance order.
    pub fn corruption_aggregate_ids(&self) -> Result<Vec<String>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT aggregate_id FROM events
                 WHERE aggregate_type = 'corruption'
                 GROUP BY aggregate_id ORDER BY MIN(id)",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
    }

    /// `CorruptionDetected` events that are the first and only event of
    /// their aggregate: persisted, but never handled before a crash.
    pub fn unhandled_detections(&self) -> Result<Vec<EventRecord>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events e
                 WHERE e.event_type = 'corruption:detected'
                   AND NOT EXISTS (
                       SELECT 1 FROM events t
                       WHERE t.aggregate_id = e.aggregate_id
                         AND t.event_version > e.event_version
                   )
                 ORDER BY e.id"
            ))?;
            let rows = stmt.query_map([], map_event_row)?;
            collect_records(rows)
        })
    }
}

/// Raw row before the JSON payload is decoded.
pub(crate) struct RawEventRow {
    id: i64,
    aggregate_type: String,
    aggregate_id: String,
    event_data: String,
    event_version: i64,
    created_at: i64,
    user_id: Option<String>,
}

pub(crate) fn map_event_row(row: &Row<'_>) -> rusqlite::Result<RawEventRow> {
    Ok(RawEventRow {
        id: row.get(0)?,
        aggregate_type: row.get(1)?,
        aggregate_id: row.get(2)?,
        event_data: row.get(4)?,
        event_version: row.get(5)?,
        created_at: row.get(6)?,
        user_id: row.get(7)?,
    })
}

pub(crate) fn decode_row(raw: RawEventRow) -> Result<EventRecord, StoreError> {
    let event: Event = serde_json::from_str(&raw.event_data)?;
    Ok(EventRecord {
        id: raw.id,
        aggregate_type: AggregateType::parse(&raw.aggregate_type)
            .unwrap_or(AggregateType::System),
        aggregate_id: raw.aggregate_id,
        event,
        event_version: raw.event_version,
        created_at: from_us(raw.created_at),
        user_id: raw.user_id,
    })
}

fn decode_optional(raw: Option<RawEventRow>) -> Result<Option<EventRecord>, StoreError> {
    raw.map(decode_row).transpose()
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RawEventRow>>,
) -> Result<Vec<EventRecord>, StoreError> {
    let mut records = Vec::new();
    for row in rows {
        records.push(decode_row(row?)?);
    }
    Ok(records)
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
