// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the remedarr corruption lifecycle.
//!
//! Every state transition of a corruption aggregate is an [`Event`].
//! Serializes with `{"type": "domain:event", ...fields}` format; unknown
//! type tags deserialize to `Custom` so old daemons can read logs written
//! by newer ones.

mod dispatch;
mod record;

pub use dispatch::{EventKind, FAILURE_KINDS, NEEDS_ATTENTION_KINDS};
pub use record::{AggregateType, EventRecord};

use crate::health::HealthErrorKind;
use crate::scan::ScanStatus;
use serde::{Deserialize, Serialize};

/// Events that drive the corruption state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- corruption --
    /// First event of every corruption aggregate: the scanner found a bad file.
    #[serde(rename = "corruption:detected")]
    CorruptionDetected {
        file_path: String,
        path_id: i64,
        corruption_type: HealthErrorKind,
        error_details: String,
        auto_remediate: bool,
        dry_run: bool,
        /// Set when the owning scan had already entered throttled mode.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        batch_throttled: bool,
    },

    // -- remediation --
    #[serde(rename = "remediation:queued")]
    RemediationQueued {
        file_path: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        dry_run: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_id: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },

    #[serde(rename = "deletion:started")]
    DeletionStarted { file_path: String, arr_path: String, media_id: i64 },

    #[serde(rename = "deletion:completed")]
    DeletionCompleted {
        file_path: String,
        arr_path: String,
        media_id: i64,
        /// Episode ids affected by the deletion (TV only). Decoding is
        /// permissive: integer arrays and heterogeneous numeric arrays are
        /// accepted, anything else collapses to empty.
        #[serde(
            default,
            skip_serializing_if = "Vec::is_empty",
            deserialize_with = "episode_ids::deserialize"
        )]
        episode_ids: Vec<i64>,
    },

    #[serde(rename = "deletion:failed")]
    DeletionFailed { file_path: String, error: String },

    // -- search --
    #[serde(rename = "search:started")]
    SearchStarted { media_id: i64 },

    #[serde(rename = "search:completed")]
    SearchCompleted {
        media_id: i64,
        arr_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        year: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        season: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        episode: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        episode_title: Option<String>,
        #[serde(
            default,
            skip_serializing_if = "Vec::is_empty",
            deserialize_with = "episode_ids::deserialize"
        )]
        episode_ids: Vec<i64>,
    },

    #[serde(rename = "search:failed")]
    SearchFailed { media_id: i64, error: String },

    /// Terminal: recovery found nothing left to search for.
    #[serde(rename = "search:exhausted")]
    SearchExhausted { reason: String },

    // -- download monitoring --
    #[serde(rename = "download:progress")]
    DownloadProgress {
        status: String,
        progress: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_left: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_client: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indexer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_bytes: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_remaining_bytes: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_completion: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        added_at: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        warning: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning_message: Option<String>,
    },

    #[serde(rename = "download:failed")]
    DownloadFailed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    #[serde(rename = "download:timeout")]
    DownloadTimeout { elapsed_seconds: u64, timeout_seconds: u64 },

    #[serde(rename = "download:ignored")]
    DownloadIgnored {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Terminal: the item left the queue without importing; a human pulled it.
    #[serde(rename = "download:manually_removed")]
    ManuallyRemoved { requires_manual: bool, last_status: String },

    /// Terminal: the arr cannot import the completed download without help.
    #[serde(rename = "download:import_blocked")]
    ImportBlocked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        messages: Vec<String>,
    },

    // -- verification --
    #[serde(rename = "verification:file_detected")]
    FileDetected {
        file_paths: Vec<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        partial_replacement: bool,
    },

    #[serde(rename = "verification:started")]
    VerificationStarted { file_paths: Vec<String> },

    /// Terminal: the replacement imported and passed a thorough health check.
    #[serde(rename = "verification:success")]
    VerificationSuccess {
        verified_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_duration_seconds: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_duration_seconds: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        release_group: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indexer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_client: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_file_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_file_size: Option<i64>,
    },

    #[serde(rename = "verification:failed")]
    VerificationFailed {
        error: String,
        failed_paths: Vec<String>,
        failed_count: usize,
        total_count: usize,
    },

    // -- retry --
    #[serde(rename = "retry:scheduled")]
    RetryScheduled { file_path: String, path_id: i64, original_state: String },

    /// Terminal: automated recovery gave up.
    #[serde(rename = "retry:max_reached")]
    MaxRetriesReached { retry_count: u32, max_retries: u32, original_state: String },

    // -- scan --
    /// Transient progress signal; fanned out to subscribers but never persisted.
    #[serde(rename = "scan:progress")]
    ScanProgress {
        scan_id: i64,
        path: String,
        status: ScanStatus,
        total_files: usize,
        files_scanned: usize,
        current_file_index: usize,
        corruptions_found: u32,
    },

    // -- system --
    #[serde(rename = "system:health_degraded")]
    SystemHealthDegraded {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        corruption_count: Option<u32>,
    },

    /// Catch-all for unknown event types (forward compatibility)
    #[serde(other, skip_serializing)]
    Custom,
}

/// Permissive decoder for `episode_ids`.
///
/// Accepts a native integer array or a heterogeneous array of numeric values
/// (floats convertible to integers). Any other shape yields an empty list.
mod episode_ids {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        Ok(extract(&value))
    }

    pub(crate) fn extract(value: &serde_json::Value) -> Vec<i64> {
        let Some(items) = value.as_array() else {
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if let Some(id) = item.as_i64() {
                ids.push(id);
            } else if let Some(f) = item.as_f64() {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    ids.push(f as i64);
                } else {
                    return Vec::new();
                }
            } else {
                return Vec::new();
            }
        }
        ids
    }
}

/// Extract episode ids from a raw `event_data` value, with the same
/// permissive semantics as the serde field decoder.
pub fn extract_episode_ids(value: &serde_json::Value) -> Vec<i64> {
    episode_ids::extract(value)
}

#[cfg(test)]
#[path = "../event_tests.rs"]
mod tests;
