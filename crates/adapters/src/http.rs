// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapter for Sonarr/Radarr v3 APIs.
//!
//! Deliberately thin and schema-tolerant: responses are read as
//! `serde_json::Value` and only the fields the engine consumes are picked
//! out, so minor upstream API drift does not break the daemon. Anything
//! smarter than field extraction belongs in the engine, not here.

use crate::arr::{
    ArrClient, DeleteResponse, HistoryItemInfo, MediaDetails, QueueItemInfo,
    TrackedDownloadState,
};
use crate::AdapterError;
use async_trait::async_trait;
use remedarr_core::scan_path::is_component_prefix;
use serde_json::Value;
use tracing::debug;

/// Which arr flavor an instance speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrKind {
    Radarr,
    Sonarr,
}

pub struct HttpArrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    kind: ArrKind,
    instance: String,
}

impl HttpArrClient {
    pub fn new(
        kind: ArrKind,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            kind,
            instance: instance.into(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, AdapterError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "arr GET");
        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api(format!("GET {path} returned {status}")));
        }
        response.json().await.map_err(|e| AdapterError::Api(e.to_string()))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AdapterError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "arr POST");
        let response = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api(format!("POST {path} returned {status}")));
        }
        // Command endpoints return a body we never consume.
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> Result<(), AdapterError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "arr DELETE");
        let response = self
            .http
            .delete(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api(format!("DELETE {path} returned {status}")));
        }
        Ok(())
    }

    /// Sonarr: the episode file row backing `arr_path`, if any.
    async fn sonarr_file_for_path(
        &self,
        series_id: i64,
        arr_path: &str,
    ) -> Result<Option<Value>, AdapterError> {
        let files = self.get(&format!("/api/v3/episodefile?seriesId={series_id}")).await?;
        Ok(files
            .as_array()
            .into_iter()
            .flatten()
            .find(|f| str_field(f, "path").as_deref() == Some(arr_path))
            .cloned())
    }
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(String::from)
}

fn i64_field(value: &Value, field: &str) -> Option<i64> {
    value.get(field).and_then(Value::as_i64)
}

fn map_queue_item(record: &Value) -> QueueItemInfo {
    let status_messages = record
        .get("statusMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .flat_map(|m| {
                    m.get("messages")
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
                .collect()
        })
        .unwrap_or_default();
    QueueItemInfo {
        id: i64_field(record, "id").unwrap_or_default(),
        title: str_field(record, "title").unwrap_or_default(),
        status: str_field(record, "status").unwrap_or_default(),
        tracked_download_state: TrackedDownloadState::parse(
            &str_field(record, "trackedDownloadState").unwrap_or_default(),
        ),
        tracked_download_status: str_field(record, "trackedDownloadStatus")
            .unwrap_or_default(),
        progress: {
            let size = i64_field(record, "size").unwrap_or_default();
            let left = i64_field(record, "sizeleft").unwrap_or_default();
            if size > 0 {
                (size - left) as f64 / size as f64 * 100.0
            } else {
                0.0
            }
        },
        time_left: str_field(record, "timeleft"),
        download_id: str_field(record, "downloadId"),
        protocol: str_field(record, "protocol"),
        download_client: str_field(record, "downloadClient"),
        indexer: str_field(record, "indexer"),
        size: i64_field(record, "size").unwrap_or_default(),
        size_left: i64_field(record, "sizeleft").unwrap_or_default(),
        estimated_completion: str_field(record, "estimatedCompletionTime"),
        added_at: str_field(record, "added"),
        error_message: str_field(record, "errorMessage"),
        status_messages,
    }
}

fn map_history_item(record: &Value) -> HistoryItemInfo {
    let data = record.get("data").cloned().unwrap_or(Value::Null);
    HistoryItemInfo {
        event_type: str_field(record, "eventType").unwrap_or_default(),
        source_title: str_field(record, "sourceTitle").unwrap_or_default(),
        quality: record
            .pointer("/quality/quality/name")
            .and_then(Value::as_str)
            .map(String::from),
        release_group: str_field(&data, "releaseGroup"),
        indexer: str_field(&data, "indexer"),
        download_client: str_field(&data, "downloadClient"),
        download_id: str_field(record, "downloadId"),
        file_path: str_field(&data, "importedPath").or_else(|| str_field(&data, "path")),
    }
}

#[async_trait]
impl ArrClient for HttpArrClient {
    async fn find_media_by_path(&self, arr_path: &str) -> Result<i64, AdapterError> {
        match self.kind {
            ArrKind::Radarr => {
                let movies = self.get("/api/v3/movie").await?;
                movies
                    .as_array()
                    .into_iter()
                    .flatten()
                    .find(|m| {
                        m.pointer("/movieFile/path").and_then(Value::as_str) == Some(arr_path)
                            || str_field(m, "path")
                                .map(|p| is_component_prefix(&p, arr_path))
                                .unwrap_or(false)
                    })
                    .and_then(|m| i64_field(m, "id"))
                    .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))
            }
            ArrKind::Sonarr => {
                let series = self.get("/api/v3/series").await?;
                series
                    .as_array()
                    .into_iter()
                    .flatten()
                    .find(|s| {
                        str_field(s, "path")
                            .map(|p| is_component_prefix(&p, arr_path))
                            .unwrap_or(false)
                    })
                    .and_then(|s| i64_field(s, "id"))
                    .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))
            }
        }
    }

    async fn delete_file(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<DeleteResponse, AdapterError> {
        match self.kind {
            ArrKind::Radarr => {
                let movie = self.get(&format!("/api/v3/movie/{media_id}")).await?;
                let file_id = movie
                    .pointer("/movieFile/id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))?;
                self.delete(&format!("/api/v3/moviefile/{file_id}")).await?;
                Ok(DeleteResponse::default())
            }
            ArrKind::Sonarr => {
                let file = self
                    .sonarr_file_for_path(media_id, arr_path)
                    .await?
                    .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))?;
                let file_id = i64_field(&file, "id")
                    .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))?;
                let episode_ids = file
                    .get("episodeIds")
                    .map(remedarr_core::event::extract_episode_ids)
                    .unwrap_or_default();
                self.delete(&format!("/api/v3/episodefile/{file_id}")).await?;
                Ok(DeleteResponse { episode_ids })
            }
        }
    }

    async fn trigger_search(
        &self,
        media_id: i64,
        _arr_path: &str,
        episode_ids: &[i64],
    ) -> Result<(), AdapterError> {
        let body = match self.kind {
            ArrKind::Radarr => {
                serde_json::json!({ "name": "MoviesSearch", "movieIds": [media_id] })
            }
            ArrKind::Sonarr if !episode_ids.is_empty() => {
                serde_json::json!({ "name": "EpisodeSearch", "episodeIds": episode_ids })
            }
            ArrKind::Sonarr => {
                serde_json::json!({ "name": "SeriesSearch", "seriesId": media_id })
            }
        };
        self.post("/api/v3/command", body).await?;
        Ok(())
    }

    async fn queue_for_path(&self, arr_path: &str) -> Result<Vec<QueueItemInfo>, AdapterError> {
        let queue = self.get("/api/v3/queue?page=1&pageSize=200").await?;
        Ok(queue
            .pointer("/records")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|r| {
                str_field(r, "outputPath")
                    .map(|p| {
                        is_component_prefix(arr_path, &p) || is_component_prefix(&p, arr_path)
                    })
                    .unwrap_or(true)
            })
            .map(map_queue_item)
            .collect())
    }

    async fn queue_items_by_media_id(
        &self,
        _arr_path: &str,
        media_id: i64,
    ) -> Result<Vec<QueueItemInfo>, AdapterError> {
        let queue = self.get("/api/v3/queue?page=1&pageSize=200").await?;
        let id_field = match self.kind {
            ArrKind::Radarr => "movieId",
            ArrKind::Sonarr => "seriesId",
        };
        Ok(queue
            .pointer("/records")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|r| i64_field(r, id_field) == Some(media_id))
            .map(map_queue_item)
            .collect())
    }

    async fn recent_history_for_media(
        &self,
        _arr_path: &str,
        media_id: i64,
        limit: usize,
    ) -> Result<Vec<HistoryItemInfo>, AdapterError> {
        let path = match self.kind {
            ArrKind::Radarr => format!("/api/v3/history/movie?movieId={media_id}"),
            ArrKind::Sonarr => format!("/api/v3/history/series?seriesId={media_id}"),
        };
        let history = self.get(&path).await?;
        Ok(history
            .as_array()
            .into_iter()
            .flatten()
            .take(limit)
            .map(map_history_item)
            .collect())
    }

    async fn all_file_paths(
        &self,
        media_id: i64,
        _details: Option<&MediaDetails>,
        _reference_path: &str,
    ) -> Result<Vec<String>, AdapterError> {
        match self.kind {
            ArrKind::Radarr => {
                let movie = self.get(&format!("/api/v3/movie/{media_id}")).await?;
                Ok(movie
                    .pointer("/movieFile/path")
                    .and_then(Value::as_str)
                    .map(|p| vec![p.to_string()])
                    .unwrap_or_default())
            }
            ArrKind::Sonarr => {
                let files =
                    self.get(&format!("/api/v3/episodefile?seriesId={media_id}")).await?;
                Ok(files
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|f| str_field(f, "path"))
                    .collect())
            }
        }
    }

    async fn media_details(
        &self,
        media_id: i64,
        _arr_path: &str,
    ) -> Result<MediaDetails, AdapterError> {
        match self.kind {
            ArrKind::Radarr => {
                let movie = self.get(&format!("/api/v3/movie/{media_id}")).await?;
                Ok(MediaDetails {
                    media_id,
                    title: str_field(&movie, "title").unwrap_or_default(),
                    year: i64_field(&movie, "year").unwrap_or_default() as i32,
                    media_type: "movie".into(),
                    instance: self.instance.clone(),
                    season: 0,
                    episode: 0,
                    episode_title: String::new(),
                    episode_ids: Vec::new(),
                })
            }
            ArrKind::Sonarr => {
                let series = self.get(&format!("/api/v3/series/{media_id}")).await?;
                Ok(MediaDetails {
                    media_id,
                    title: str_field(&series, "title").unwrap_or_default(),
                    year: i64_field(&series, "year").unwrap_or_default() as i32,
                    media_type: "episode".into(),
                    instance: self.instance.clone(),
                    season: 0,
                    episode: 0,
                    episode_title: String::new(),
                    episode_ids: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
