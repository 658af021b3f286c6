// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for tests.
//!
//! `FakeArrClient` serves scripted queue/history/file responses and records
//! every mutating call; `FakeDetector` returns per-path scripted verdicts.
//! Both are cheap clones sharing interior state so tests can script and
//! assert through separate handles.

use crate::arr::{
    ArrClient, DeleteResponse, HistoryItemInfo, MediaDetails, QueueItemInfo,
};
use crate::detector::HealthDetector;
use crate::AdapterError;
use async_trait::async_trait;
use parking_lot::Mutex;
use remedarr_core::health::{DetectionConfig, DetectionMode, HealthCheckError};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct FakeArrState {
    media_by_path: HashMap<String, i64>,
    find_error: Option<String>,
    delete_error: Option<String>,
    delete_response: DeleteResponse,
    search_error: Option<String>,
    queue_script: VecDeque<Vec<QueueItemInfo>>,
    queue_current: Vec<QueueItemInfo>,
    history: Vec<HistoryItemInfo>,
    history_failures_remaining: u32,
    file_paths: Vec<String>,
    details: HashMap<i64, MediaDetails>,
    deletes: Vec<(i64, String)>,
    searches: Vec<(i64, String, Vec<i64>)>,
    queue_calls: u32,
    history_calls: u32,
}

/// Scripted in-memory [`ArrClient`].
#[derive(Clone, Default)]
pub struct FakeArrClient {
    state: Arc<Mutex<FakeArrState>>,
}

impl FakeArrClient {
    pub fn new() -> Self {
        Self::default()
    }

    // -- scripting --

    pub fn set_media_id(&self, arr_path: &str, media_id: i64) {
        self.state.lock().media_by_path.insert(arr_path.to_string(), media_id);
    }

    pub fn fail_find(&self, message: &str) {
        self.state.lock().find_error = Some(message.to_string());
    }

    pub fn fail_delete(&self, message: &str) {
        self.state.lock().delete_error = Some(message.to_string());
    }

    pub fn set_delete_response(&self, response: DeleteResponse) {
        self.state.lock().delete_response = response;
    }

    pub fn fail_search(&self, message: &str) {
        self.state.lock().search_error = Some(message.to_string());
    }

    /// Queue responses are consumed one per poll; the last scripted
    /// response becomes sticky once the script drains.
    pub fn push_queue_response(&self, items: Vec<QueueItemInfo>) {
        self.state.lock().queue_script.push_back(items);
    }

    pub fn set_history(&self, items: Vec<HistoryItemInfo>) {
        self.state.lock().history = items;
    }

    /// Make the next `n` history calls fail.
    pub fn fail_history_times(&self, n: u32) {
        self.state.lock().history_failures_remaining = n;
    }

    pub fn set_file_paths(&self, paths: Vec<String>) {
        self.state.lock().file_paths = paths;
    }

    pub fn set_media_details(&self, details: MediaDetails) {
        self.state.lock().details.insert(details.media_id, details);
    }

    // -- assertions --

    pub fn deletes(&self) -> Vec<(i64, String)> {
        self.state.lock().deletes.clone()
    }

    pub fn searches(&self) -> Vec<(i64, String, Vec<i64>)> {
        self.state.lock().searches.clone()
    }

    pub fn queue_calls(&self) -> u32 {
        self.state.lock().queue_calls
    }

    pub fn history_calls(&self) -> u32 {
        self.state.lock().history_calls
    }

    fn next_queue(&self) -> Vec<QueueItemInfo> {
        let mut state = self.state.lock();
        state.queue_calls += 1;
        if let Some(items) = state.queue_script.pop_front() {
            state.queue_current = items;
        }
        state.queue_current.clone()
    }
}

#[async_trait]
impl ArrClient for FakeArrClient {
    async fn find_media_by_path(&self, arr_path: &str) -> Result<i64, AdapterError> {
        let state = self.state.lock();
        if let Some(message) = &state.find_error {
            return Err(AdapterError::Api(message.clone()));
        }
        state
            .media_by_path
            .get(arr_path)
            .copied()
            .ok_or_else(|| AdapterError::MediaNotFound(arr_path.to_string()))
    }

    async fn delete_file(
        &self,
        media_id: i64,
        arr_path: &str,
    ) -> Result<DeleteResponse, AdapterError> {
        let mut state = self.state.lock();
        state.deletes.push((media_id, arr_path.to_string()));
        if let Some(message) = &state.delete_error {
            return Err(AdapterError::Api(message.clone()));
        }
        Ok(state.delete_response.clone())
    }

    async fn trigger_search(
        &self,
        media_id: i64,
        arr_path: &str,
        episode_ids: &[i64],
    ) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.searches.push((media_id, arr_path.to_string(), episode_ids.to_vec()));
        if let Some(message) = &state.search_error {
            return Err(AdapterError::Api(message.clone()));
        }
        Ok(())
    }

    async fn queue_for_path(&self, _arr_path: &str) -> Result<Vec<QueueItemInfo>, AdapterError> {
        Ok(self.next_queue())
    }

    async fn queue_items_by_media_id(
        &self,
        _arr_path: &str,
        _media_id: i64,
    ) -> Result<Vec<QueueItemInfo>, AdapterError> {
        Ok(self.next_queue())
    }

    async fn recent_history_for_media(
        &self,
        _arr_path: &str,
        _media_id: i64,
        limit: usize,
    ) -> Result<Vec<HistoryItemInfo>, AdapterError> {
        let mut state = self.state.lock();
        state.history_calls += 1;
        if state.history_failures_remaining > 0 {
            state.history_failures_remaining -= 1;
            return Err(AdapterError::Api("history unavailable".into()));
        }
        Ok(state.history.iter().take(limit).cloned().collect())
    }

    async fn all_file_paths(
        &self,
        _media_id: i64,
        _details: Option<&MediaDetails>,
        _reference_path: &str,
    ) -> Result<Vec<String>, AdapterError> {
        Ok(self.state.lock().file_paths.clone())
    }

    async fn media_details(
        &self,
        media_id: i64,
        _arr_path: &str,
    ) -> Result<MediaDetails, AdapterError> {
        let state = self.state.lock();
        Ok(state
            .details
            .get(&media_id)
            .cloned()
            .unwrap_or(MediaDetails { media_id, ..MediaDetails::default() }))
    }
}

type Verdict = Result<(), HealthCheckError>;

#[derive(Default)]
struct FakeDetectorState {
    sequences: HashMap<PathBuf, VecDeque<Verdict>>,
    sticky: HashMap<PathBuf, Verdict>,
    checks: Vec<(PathBuf, DetectionMode)>,
}

/// Scripted in-memory [`HealthDetector`]. Unscripted paths are healthy.
#[derive(Clone, Default)]
pub struct FakeDetector {
    state: Arc<Mutex<FakeDetectorState>>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed verdict for every check of `path`.
    pub fn set_verdict(&self, path: impl Into<PathBuf>, verdict: Verdict) {
        self.state.lock().sticky.insert(path.into(), verdict);
    }

    /// One-shot verdict consumed before the sticky verdict applies.
    pub fn push_verdict(&self, path: impl Into<PathBuf>, verdict: Verdict) {
        self.state.lock().sequences.entry(path.into()).or_default().push_back(verdict);
    }

    /// Every check performed, in order.
    pub fn checks(&self) -> Vec<(PathBuf, DetectionMode)> {
        self.state.lock().checks.clone()
    }

    pub fn check_count(&self, path: &Path) -> usize {
        self.state.lock().checks.iter().filter(|(p, _)| p == path).count()
    }

    fn verdict_for(&self, path: &Path, mode: DetectionMode) -> Verdict {
        let mut state = self.state.lock();
        state.checks.push((path.to_path_buf(), mode));
        if let Some(seq) = state.sequences.get_mut(path) {
            if let Some(verdict) = seq.pop_front() {
                return verdict;
            }
        }
        state.sticky.get(path).cloned().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl HealthDetector for FakeDetector {
    async fn check(&self, path: &Path, mode: DetectionMode) -> Result<(), HealthCheckError> {
        self.verdict_for(path, mode)
    }

    async fn check_with_config(
        &self,
        path: &Path,
        config: &DetectionConfig,
    ) -> Result<(), HealthCheckError> {
        self.verdict_for(path, config.mode)
    }
}
