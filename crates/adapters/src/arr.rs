// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Arr manager client interface.
//!
//! The arr owns the media database and the download pipeline; remedarr only
//! ever asks it to delete a file, search for a replacement, and report on
//! queue/history state. HTTP specifics live behind this trait.

use crate::AdapterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The `trackedDownloadState` reported by arr queue items.
///
/// Parsed case-insensitively; unrecognized states are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackedDownloadState {
    Downloading,
    ImportPending,
    Importing,
    Imported,
    FailedPending,
    Failed,
    Ignored,
    ImportBlocked,
    Other(String),
}

impl TrackedDownloadState {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "downloading" => Self::Downloading,
            "importpending" => Self::ImportPending,
            "importing" => Self::Importing,
            "imported" => Self::Imported,
            "failedpending" => Self::FailedPending,
            "failed" => Self::Failed,
            "ignored" => Self::Ignored,
            "importblocked" => Self::ImportBlocked,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Downloading => "downloading",
            Self::ImportPending => "importPending",
            Self::Importing => "importing",
            Self::Imported => "imported",
            Self::FailedPending => "failedPending",
            Self::Failed => "failed",
            Self::Ignored => "ignored",
            Self::ImportBlocked => "importBlocked",
            Self::Other(s) => s,
        }
    }

    /// States from which an import can still be confirmed via history.
    pub fn is_import_phase(&self) -> bool {
        matches!(self, Self::ImportPending | Self::Importing | Self::Imported)
    }
}

impl From<String> for TrackedDownloadState {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TrackedDownloadState> for String {
    fn from(state: TrackedDownloadState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for TrackedDownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item from the arr download queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItemInfo {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub tracked_download_state: TrackedDownloadState,
    pub tracked_download_status: String,
    /// Completion percentage, 0–100.
    pub progress: f64,
    pub time_left: Option<String>,
    pub download_id: Option<String>,
    pub protocol: Option<String>,
    pub download_client: Option<String>,
    pub indexer: Option<String>,
    pub size: i64,
    pub size_left: i64,
    pub estimated_completion: Option<String>,
    pub added_at: Option<String>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub status_messages: Vec<String>,
}

impl Default for QueueItemInfo {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            status: "queued".into(),
            tracked_download_state: TrackedDownloadState::Downloading,
            tracked_download_status: "ok".into(),
            progress: 0.0,
            time_left: None,
            download_id: None,
            protocol: None,
            download_client: None,
            indexer: None,
            size: 0,
            size_left: 0,
            estimated_completion: None,
            added_at: None,
            error_message: None,
            status_messages: Vec::new(),
        }
    }
}

/// One arr history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryItemInfo {
    /// Arr history event type, e.g. `downloadFolderImported`.
    pub event_type: String,
    pub source_title: String,
    pub quality: Option<String>,
    pub release_group: Option<String>,
    pub indexer: Option<String>,
    pub download_client: Option<String>,
    pub download_id: Option<String>,
    /// Imported file path in the arr namespace, when the entry carries one.
    pub file_path: Option<String>,
}

impl HistoryItemInfo {
    /// History event types that confirm a completed import.
    pub fn is_import_event(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            "downloadFolderImported" | "episodeFileImported" | "movieFileImported"
        )
    }
}

/// Media metadata used to enrich `SearchCompleted` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    pub media_id: i64,
    pub title: String,
    /// Zero when unknown.
    pub year: i32,
    /// `movie` or `episode`.
    pub media_type: String,
    /// Name of the arr instance that owns the media.
    pub instance: String,
    /// Zero for movies.
    pub season: i32,
    /// Zero for movies.
    pub episode: i32,
    pub episode_title: String,
    #[serde(default)]
    pub episode_ids: Vec<i64>,
}

/// Metadata returned by a successful deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Episode ids the deleted file covered (TV only).
    #[serde(default)]
    pub episode_ids: Vec<i64>,
}

/// Client for one arr instance, addressed through arr-namespace paths.
#[async_trait]
pub trait ArrClient: Send + Sync {
    /// Resolve the media id owning `arr_path`.
    async fn find_media_by_path(&self, arr_path: &str) -> Result<i64, AdapterError>;

    /// Ask the arr to delete the file backing `media_id` at `arr_path`.
    async fn delete_file(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<DeleteResponse, AdapterError>;

    /// Trigger a replacement search.
    async fn trigger_search(
        &self,
        media_id: i64,
        arr_path: &str,
        episode_ids: &[i64],
    ) -> Result<(), AdapterError>;

    /// Queue items relevant to `arr_path`.
    async fn queue_for_path(&self, arr_path: &str) -> Result<Vec<QueueItemInfo>, AdapterError>;

    /// Queue items for a specific media id under `arr_path`.
    async fn queue_items_by_media_id(
        &self,
        arr_path: &str,
        media_id: i64,
    ) -> Result<Vec<QueueItemInfo>, AdapterError>;

    /// Recent history entries for a media item, newest first.
    async fn recent_history_for_media(
        &self,
        arr_path: &str,
        media_id: i64,
        limit: usize,
    ) -> Result<Vec<HistoryItemInfo>, AdapterError>;

    /// Every on-disk path (arr namespace) the arr currently tracks for the
    /// media. `reference_path` disambiguates multi-root setups.
    async fn all_file_paths(
        &self,
        media_id: i64,
        details: Option<&MediaDetails>,
        reference_path: &str,
    ) -> Result<Vec<String>, AdapterError>;

    /// Metadata for event enrichment.
    async fn media_details(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<MediaDetails, AdapterError>;
}

/// Routes arr calls to the instance owning the path.
///
/// Every [`ArrClient`] method carries an arr-namespace path (`arr_path` or
/// `reference_path`); the router picks the instance whose declared root is
/// the longest whole-component prefix of it.
pub struct ArrRouter {
    routes: Vec<(String, std::sync::Arc<dyn ArrClient>)>,
}

impl ArrRouter {
    pub fn new(mut routes: Vec<(String, std::sync::Arc<dyn ArrClient>)>) -> Self {
        for (root, _) in &mut routes {
            *root = root.trim_end_matches('/').to_string();
        }
        // Longest root first so the first match wins.
        routes.sort_by_key(|(root, _)| std::cmp::Reverse(root.len()));
        Self { routes }
    }

    fn client_for(&self, path: &str) -> Result<&std::sync::Arc<dyn ArrClient>, AdapterError> {
        self.routes
            .iter()
            .find(|(root, _)| remedarr_core::scan_path::is_component_prefix(root, path))
            .map(|(_, client)| client)
            .ok_or_else(|| AdapterError::NoMapping(path.to_string()))
    }
}

#[async_trait]
impl ArrClient for ArrRouter {
    async fn find_media_by_path(&self, arr_path: &str) -> Result<i64, AdapterError> {
        self.client_for(arr_path)?.find_media_by_path(arr_path).await
    }

    async fn delete_file(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<DeleteResponse, AdapterError> {
        self.client_for(arr_path)?.delete_file(media_id, arr_path).await
    }

    async fn trigger_search(
        &self,
        media_id: i64,
        arr_path: &str,
        episode_ids: &[i64],
    ) -> Result<(), AdapterError> {
        self.client_for(arr_path)?.trigger_search(media_id, arr_path, episode_ids).await
    }

    async fn queue_for_path(&self, arr_path: &str) -> Result<Vec<QueueItemInfo>, AdapterError> {
        self.client_for(arr_path)?.queue_for_path(arr_path).await
    }

    async fn queue_items_by_media_id(
        &self,
        arr_path: &str,
        media_id: i64,
    ) -> Result<Vec<QueueItemInfo>, AdapterError> {
        self.client_for(arr_path)?.queue_items_by_media_id(arr_path, media_id).await
    }

    async fn recent_history_for_media(
        &self,
        arr_path: &str,
        media_id: i64,
        limit: usize,
    ) -> Result<Vec<HistoryItemInfo>, AdapterError> {
        self.client_for(arr_path)?
            .recent_history_for_media(arr_path, media_id, limit)
            .await
    }

    async fn all_file_paths(
        &self,
        media_id: i64,
        details: Option<&MediaDetails>,
        reference_path: &str,
    ) -> Result<Vec<String>, AdapterError> {
        self.client_for(reference_path)?
            .all_file_paths(media_id, details, reference_path)
            .await
    }

    async fn media_details(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<MediaDetails, AdapterError> {
        self.client_for(arr_path)?.media_details(media_id, arr_path).await
    }
}

#[cfg(test)]
#[path = "arr_tests.rs"]
mod tests;
