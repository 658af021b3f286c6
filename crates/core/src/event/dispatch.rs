// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatch methods — kind, name, log summary, classification sets.

use super::Event;
use serde::{Deserialize, Serialize};

/// Fieldless discriminant of [`Event`].
///
/// Used as the subscription key on the event bus and as the persisted
/// `event_type` column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CorruptionDetected,
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
    ScanProgress,
    SystemHealthDegraded,
    Custom,
}

/// Event kinds the retry monitor converts into scheduled retries.
pub const FAILURE_KINDS: &[EventKind] = &[
    EventKind::DeletionFailed,
    EventKind::SearchFailed,
    EventKind::VerificationFailed,
    EventKind::DownloadTimeout,
    EventKind::DownloadFailed,
];

/// Terminal informational kinds the retry monitor only logs.
pub const NEEDS_ATTENTION_KINDS: &[EventKind] = &[
    EventKind::ImportBlocked,
    EventKind::SearchExhausted,
    EventKind::ManuallyRemoved,
    EventKind::MaxRetriesReached,
];

impl EventKind {
    /// The serialized tag, also stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CorruptionDetected => "corruption:detected",
            EventKind::RemediationQueued => "remediation:queued",
            EventKind::DeletionStarted => "deletion:started",
            EventKind::DeletionCompleted => "deletion:completed",
            EventKind::DeletionFailed => "deletion:failed",
            EventKind::SearchStarted => "search:started",
            EventKind::SearchCompleted => "search:completed",
            EventKind::SearchFailed => "search:failed",
            EventKind::SearchExhausted => "search:exhausted",
            EventKind::DownloadProgress => "download:progress",
            EventKind::DownloadFailed => "download:failed",
            EventKind::DownloadTimeout => "download:timeout",
            EventKind::DownloadIgnored => "download:ignored",
            EventKind::ManuallyRemoved => "download:manually_removed",
            EventKind::ImportBlocked => "download:import_blocked",
            EventKind::FileDetected => "verification:file_detected",
            EventKind::VerificationStarted => "verification:started",
            EventKind::VerificationSuccess => "verification:success",
            EventKind::VerificationFailed => "verification:failed",
            EventKind::RetryScheduled => "retry:scheduled",
            EventKind::MaxRetriesReached => "retry:max_reached",
            EventKind::ScanProgress => "scan:progress",
            EventKind::SystemHealthDegraded => "system:health_degraded",
            EventKind::Custom => "custom",
        }
    }

    /// Parse a stored `event_type` string. Unknown tags map to `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "corruption:detected" => EventKind::CorruptionDetected,
            "remediation:queued" => EventKind::RemediationQueued,
            "deletion:started" => EventKind::DeletionStarted,
            "deletion:completed" => EventKind::DeletionCompleted,
            "deletion:failed" => EventKind::DeletionFailed,
            "search:started" => EventKind::SearchStarted,
            "search:completed" => EventKind::SearchCompleted,
            "search:failed" => EventKind::SearchFailed,
            "search:exhausted" => EventKind::SearchExhausted,
            "download:progress" => EventKind::DownloadProgress,
            "download:failed" => EventKind::DownloadFailed,
            "download:timeout" => EventKind::DownloadTimeout,
            "download:ignored" => EventKind::DownloadIgnored,
            "download:manually_removed" => EventKind::ManuallyRemoved,
            "download:import_blocked" => EventKind::ImportBlocked,
            "verification:file_detected" => EventKind::FileDetected,
            "verification:started" => EventKind::VerificationStarted,
            "verification:success" => EventKind::VerificationSuccess,
            "verification:failed" => EventKind::VerificationFailed,
            "retry:scheduled" => EventKind::RetryScheduled,
            "retry:max_reached" => EventKind::MaxRetriesReached,
            "scan:progress" => EventKind::ScanProgress,
            "system:health_degraded" => EventKind::SystemHealthDegraded,
            _ => EventKind::Custom,
        }
    }

    pub fn is_failure(&self) -> bool {
        FAILURE_KINDS.contains(self)
    }

    pub fn needs_attention(&self) -> bool {
        NEEDS_ATTENTION_KINDS.contains(self)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CorruptionDetected { .. } => EventKind::CorruptionDetected,
            Event::RemediationQueued { .. } => EventKind::RemediationQueued,
            Event::DeletionStarted { .. } => EventKind::DeletionStarted,
            Event::DeletionCompleted { .. } => EventKind::DeletionCompleted,
            Event::DeletionFailed { .. } => EventKind::DeletionFailed,
            Event::SearchStarted { .. } => EventKind::SearchStarted,
            Event::SearchCompleted { .. } => EventKind::SearchCompleted,
            Event::SearchFailed { .. } => EventKind::SearchFailed,
            Event::SearchExhausted { .. } => EventKind::SearchExhausted,
            Event::DownloadProgress { .. } => EventKind::DownloadProgress,
            Event::DownloadFailed { .. } => EventKind::DownloadFailed,
            Event::DownloadTimeout { .. } => EventKind::DownloadTimeout,
            Event::DownloadIgnored { .. } => EventKind::DownloadIgnored,
            Event::ManuallyRemoved { .. } => EventKind::ManuallyRemoved,
            Event::ImportBlocked { .. } => EventKind::ImportBlocked,
            Event::FileDetected { .. } => EventKind::FileDetected,
            Event::VerificationStarted { .. } => EventKind::VerificationStarted,
            Event::VerificationSuccess { .. } => EventKind::VerificationSuccess,
            Event::VerificationFailed { .. } => EventKind::VerificationFailed,
            Event::RetryScheduled { .. } => EventKind::RetryScheduled,
            Event::MaxRetriesReached { .. } => EventKind::MaxRetriesReached,
            Event::ScanProgress { .. } => EventKind::ScanProgress,
            Event::SystemHealthDegraded { .. } => EventKind::SystemHealthDegraded,
            Event::Custom => EventKind::Custom,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// One-line summary for structured logging.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::CorruptionDetected { file_path, corruption_type, .. } => {
                format!("{t} file={file_path} type={corruption_type}")
            }
            Event::RemediationQueued { file_path, dry_run, .. } => {
                if *dry_run {
                    format!("{t} file={file_path} dry_run")
                } else {
                    format!("{t} file={file_path}")
                }
            }
            Event::DeletionStarted { file_path, media_id, .. }
            | Event::DeletionCompleted { file_path, media_id, .. } => {
                format!("{t} file={file_path} media={media_id}")
            }
            Event::DeletionFailed { file_path, error } => {
                format!("{t} file={file_path} error={error}")
            }
            Event::SearchStarted { media_id } => format!("{t} media={media_id}"),
            Event::SearchCompleted { media_id, title, .. } => match title {
                Some(title) => format!("{t} media={media_id} title={title}"),
                None => format!("{t} media={media_id}"),
            },
            Event::SearchFailed { media_id, error } => {
                format!("{t} media={media_id} error={error}")
            }
            Event::SearchExhausted { reason } => format!("{t} reason={reason}"),
            Event::DownloadProgress { status, progress, .. } => {
                format!("{t} status={status} progress={progress:.0}%")
            }
            Event::DownloadFailed { error, .. } => format!("{t} error={error}"),
            Event::DownloadTimeout { elapsed_seconds, .. } => {
                format!("{t} elapsed={elapsed_seconds}s")
            }
            Event::DownloadIgnored { .. } => t.to_string(),
            Event::ManuallyRemoved { last_status, .. } => {
                format!("{t} last_status={last_status}")
            }
            Event::ImportBlocked { messages, .. } => {
                format!("{t} messages={}", messages.len())
            }
            Event::FileDetected { file_paths, partial_replacement } => {
                if *partial_replacement {
                    format!("{t} files={} partial", file_paths.len())
                } else {
                    format!("{t} files={}", file_paths.len())
                }
            }
            Event::VerificationStarted { file_paths } => {
                format!("{t} files={}", file_paths.len())
            }
            Event::VerificationSuccess { verified_count, .. } => {
                format!("{t} verified={verified_count}")
            }
            Event::VerificationFailed { failed_count, total_count, .. } => {
                format!("{t} failed={failed_count}/{total_count}")
            }
            Event::RetryScheduled { file_path, original_state, .. } => {
                format!("{t} file={file_path} from={original_state}")
            }
            Event::MaxRetriesReached { retry_count, max_retries, .. } => {
                format!("{t} retries={retry_count}/{max_retries}")
            }
            Event::ScanProgress { scan_id, files_scanned, total_files, status, .. } => {
                format!("{t} scan={scan_id} {files_scanned}/{total_files} status={status}")
            }
            Event::SystemHealthDegraded { reason, .. } => format!("{t} reason={reason}"),
            Event::Custom => t.to_string(),
        }
    }
}
