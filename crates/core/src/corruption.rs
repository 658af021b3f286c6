// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Corruption aggregate state machine and projection.
//!
//! The event log is the source of truth; [`CorruptionStatus`] is a derived
//! projection kept for convenience (recovery scans it for stale items). It
//! must always be rebuildable by replaying the aggregate's events in
//! `event_version` order and is never consulted for correctness decisions
//! in the hot path.

use crate::event::{Event, EventKind, EventRecord};
use crate::id::CorruptionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a corruption aggregate.
///
/// States mirror the event that put the aggregate there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionState {
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
}

crate::simple_display! {
    CorruptionState {
        Detected => "detected",
        RemediationQueued => "remediation_queued",
        DeletionStarted => "deletion_started",
        DeletionCompleted => "deletion_completed",
        DeletionFailed => "deletion_failed",
        SearchStarted => "search_started",
        SearchCompleted => "search_completed",
        SearchFailed => "search_failed",
        SearchExhausted => "search_exhausted",
        DownloadProgress => "download_progress",
        DownloadFailed => "download_failed",
        DownloadTimeout => "download_timeout",
        DownloadIgnored => "download_ignored",
        ManuallyRemoved => "manually_removed",
        ImportBlocked => "import_blocked",
        FileDetected => "file_detected",
        VerificationStarted => "verification_started",
        VerificationSuccess => "verification_success",
        VerificationFailed => "verification_failed",
        RetryScheduled => "retry_scheduled",
        MaxRetriesReached => "max_retries_reached",
    }
}

/// Recovery routing classes for non-terminal states (see [`StateClass`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// A search was triggered; the arr may be downloading or importing.
    PostSearch,
    /// Remediation began but no search was confirmed.
    EarlyRemediation,
    /// The last transition was a failure awaiting retry scheduling.
    Failed,
}

impl CorruptionState {
    /// Map a stored event kind to the state it leaves the aggregate in.
    /// Non-state-bearing kinds (scan/system/custom) return `None`.
    pub fn from_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::CorruptionDetected => Some(Self::Detected),
            EventKind::RemediationQueued => Some(Self::RemediationQueued),
            EventKind::DeletionStarted => Some(Self::DeletionStarted),
            EventKind::DeletionCompleted => Some(Self::DeletionCompleted),
            EventKind::DeletionFailed => Some(Self::DeletionFailed),
            EventKind::SearchStarted => Some(Self::SearchStarted),
            EventKind::SearchCompleted => Some(Self::SearchCompleted),
            EventKind::SearchFailed => Some(Self::SearchFailed),
            EventKind::SearchExhausted => Some(Self::SearchExhausted),
            EventKind::DownloadProgress => Some(Self::DownloadProgress),
            EventKind::DownloadFailed => Some(Self::DownloadFailed),
            EventKind::DownloadTimeout => Some(Self::DownloadTimeout),
            EventKind::DownloadIgnored => Some(Self::DownloadIgnored),
            EventKind::ManuallyRemoved => Some(Self::ManuallyRemoved),
            EventKind::ImportBlocked => Some(Self::ImportBlocked),
            EventKind::FileDetected => Some(Self::FileDetected),
            EventKind::VerificationStarted => Some(Self::VerificationStarted),
            EventKind::VerificationSuccess => Some(Self::VerificationSuccess),
            EventKind::VerificationFailed => Some(Self::VerificationFailed),
            EventKind::RetryScheduled => Some(Self::RetryScheduled),
            EventKind::MaxRetriesReached => Some(Self::MaxRetriesReached),
            EventKind::ScanProgress
            | EventKind::SystemHealthDegraded
            | EventKind::Custom => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detected" => Some(Self::Detected),
            "remediation_queued" => Some(Self::RemediationQueued),
            "deletion_started" => Some(Self::DeletionStarted),
            "deletion_completed" => Some(Self::DeletionCompleted),
            "deletion_failed" => Some(Self::DeletionFailed),
            "search_started" => Some(Self::SearchStarted),
            "search_completed" => Some(Self::SearchCompleted),
            "search_failed" => Some(Self::SearchFailed),
            "search_exhausted" => Some(Self::SearchExhausted),
            "download_progress" => Some(Self::DownloadProgress),
            "download_failed" => Some(Self::DownloadFailed),
            "download_timeout" => Some(Self::DownloadTimeout),
            "download_ignored" => Some(Self::DownloadIgnored),
            "manually_removed" => Some(Self::ManuallyRemoved),
            "import_blocked" => Some(Self::ImportBlocked),
            "file_detected" => Some(Self::FileDetected),
            "verification_started" => Some(Self::VerificationStarted),
            "verification_success" => Some(Self::VerificationSuccess),
            "verification_failed" => Some(Self::VerificationFailed),
            "retry_scheduled" => Some(Self::RetryScheduled),
            "max_retries_reached" => Some(Self::MaxRetriesReached),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::VerificationSuccess
                | Self::SearchExhausted
                | Self::MaxRetriesReached
                | Self::ImportBlocked
                | Self::ManuallyRemoved
        )
    }

    /// Recovery class for states that can go stale. Terminal states and
    /// states with an active owner-of-record (`Detected`, `RetryScheduled`,
    /// `VerificationStarted`, `DownloadIgnored`) return `None`.
    pub fn stale_class(&self) -> Option<StateClass> {
        match self {
            Self::DownloadProgress
            | Self::SearchCompleted
            | Self::SearchStarted
            | Self::FileDetected => Some(StateClass::PostSearch),
            Self::RemediationQueued | Self::DeletionStarted | Self::DeletionCompleted => {
                Some(StateClass::EarlyRemediation)
            }
            Self::DeletionFailed
            | Self::SearchFailed
            | Self::VerificationFailed
            | Self::DownloadTimeout
            | Self::DownloadFailed => Some(StateClass::Failed),
            _ => None,
        }
    }
}

/// Derived per-aggregate projection row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionStatus {
    pub corruption_id: CorruptionId,
    pub current_state: CorruptionState,
    pub file_path: String,
    pub path_id: i64,
    /// Arr media id, discovered during remediation.
    pub media_id: Option<i64>,
    /// Number of failure events observed on the aggregate.
    pub retry_count: u32,
    pub last_updated_at: DateTime<Utc>,
}

impl CorruptionStatus {
    /// Seed a projection from the aggregate's first event. Returns `None`
    /// unless the event is a `CorruptionDetected`.
    pub fn from_first_event(record: &EventRecord) -> Option<Self> {
        match &record.event {
            Event::CorruptionDetected { file_path, path_id, .. } => Some(Self {
                corruption_id: CorruptionId::from_string(&record.aggregate_id),
                current_state: CorruptionState::Detected,
                file_path: file_path.clone(),
                path_id: *path_id,
                media_id: None,
                retry_count: 0,
                last_updated_at: record.created_at,
            }),
            _ => None,
        }
    }

    /// Fold one subsequent event into the projection.
    pub fn apply(&mut self, record: &EventRecord) {
        if let Some(state) = CorruptionState::from_kind(record.kind()) {
            self.current_state = state;
        }
        match &record.event {
            Event::DeletionStarted { media_id, .. }
            | Event::DeletionCompleted { media_id, .. }
            | Event::SearchStarted { media_id }
            | Event::SearchCompleted { media_id, .. } => {
                if *media_id != 0 {
                    self.media_id = Some(*media_id);
                }
            }
            _ => {}
        }
        if record.kind().is_failure() {
            self.retry_count += 1;
        }
        self.last_updated_at = record.created_at;
    }

    /// Rebuild a projection by replaying records in version order.
    pub fn replay<'a>(records: impl IntoIterator<Item = &'a EventRecord>) -> Option<Self> {
        let mut iter = records.into_iter();
        let mut status = Self::from_first_event(iter.next()?)?;
        for record in iter {
            status.apply(record);
        }
        Some(status)
    }
}

#[cfg(test)]
#[path = "corruption_tests.rs"]
mod tests;
