// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stored event form.

use super::{Event, EventKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate families sharing the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Corruption,
    Scan,
    System,
}

crate::simple_display! {
    AggregateType {
        Corruption => "corruption",
        Scan => "scan",
        System => "system",
    }
}

impl AggregateType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "corruption" => Some(Self::Corruption),
            "scan" => Some(Self::Scan),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// An event as persisted in (or read back from) the event log.
///
/// Invariants, enforced by the log: records are immutable once written; for
/// a given `aggregate_id` both `event_version` and `created_at` strictly
/// increase; a corruption aggregate always starts with
/// [`EventKind::CorruptionDetected`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic log id. Zero for transient (unpersisted) records.
    pub id: i64,
    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    pub event: Event,
    /// Per-aggregate monotonic counter starting at 1.
    pub event_version: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Build a transient record for fan-out without persistence.
    pub fn transient(
        aggregate_type: AggregateType,
        aggregate_id: impl Into<String>,
        event: Event,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            aggregate_type,
            aggregate_id: aggregate_id.into(),
            event,
            event_version: 0,
            created_at,
            user_id: None,
        }
    }
}
