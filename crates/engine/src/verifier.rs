// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The verifier: watches the arr until a replacement imports, then
//! health-checks it.
//!
//! One monitor task per aggregate, started by `SearchCompleted`. The task
//! alternates queue and history polling, backs off exponentially while the
//! queue is empty, and ends in exactly one terminal verification event
//! (`VerificationSuccess`, `VerificationFailed`, `DownloadTimeout`,
//! `DownloadFailed`, `DownloadIgnored`, or `ManuallyRemoved`).

use crate::bus::{EventBus, Subscriber};
use crate::config::VerifierConfig;
use crate::time::{backoff, sleep_unless_cancelled};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use remedarr_adapters::{
    ArrClient, HealthDetector, HistoryItemInfo, PathMapper, QueueItemInfo, TrackedDownloadState,
};
use remedarr_core::clock::Clock;
use remedarr_core::event::{AggregateType, Event, EventKind, EventRecord};
use remedarr_core::health::DetectionMode;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Bound on individual arr API calls.
const ARR_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Enrichment captured from history entries, attached to the terminal
/// verification event.
#[derive(Debug, Clone, Default)]
struct VerifyMeta {
    quality: Option<String>,
    release_group: Option<String>,
    indexer: Option<String>,
    download_client: Option<String>,
    first_progress_at: Option<DateTime<Utc>>,
}

pub struct Verifier<C: Clock, D: HealthDetector + 'static> {
    bus: Arc<EventBus<C>>,
    store: remedarr_storage::Store,
    arr: Arc<dyn ArrClient>,
    mapper: Arc<PathMapper>,
    detector: Arc<D>,
    clock: C,
    config: VerifierConfig,
    /// Last tracked-download state per aggregate. Presence means "seen in
    /// the queue"; the value deduplicates `ImportBlocked` emissions.
    last_state: Mutex<HashMap<String, String>>,
    verify_meta: Mutex<HashMap<String, VerifyMeta>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<C: Clock, D: HealthDetector> Verifier<C, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<EventBus<C>>,
        store: remedarr_storage::Store,
        arr: Arc<dyn ArrClient>,
        mapper: Arc<PathMapper>,
        detector: Arc<D>,
        clock: C,
        config: VerifierConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            store,
            arr,
            mapper,
            detector,
            clock,
            config,
            last_state: Mutex::new(HashMap::new()),
            verify_meta: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn subscribe(self: &Arc<Self>, bus: &EventBus<C>) {
        bus.subscribe(
            EventKind::SearchCompleted,
            Arc::new(Subscription(Arc::clone(self))) as Arc<dyn Subscriber>,
        );
    }

    /// Stop all monitor tasks. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn publish(&self, aggregate_id: &str, event: Event) {
        if let Err(e) =
            self.bus.publish(AggregateType::Corruption, aggregate_id, event).await
        {
            warn!(aggregate_id, error = %e, "failed to publish verification event");
        }
    }

    fn cleanup(&self, aggregate_id: &str) {
        self.last_state.lock().remove(aggregate_id);
        self.verify_meta.lock().remove(aggregate_id);
    }

    /// Verification deadline: scan-path override, else the engine default.
    fn timeout_for(&self, aggregate_id: &str) -> (Duration, Option<String>) {
        let status = self.store.corruption_status(aggregate_id).ok().flatten();
        let file_path = status.as_ref().map(|s| s.file_path.clone());
        let timeout = status
            .and_then(|s| self.store.scan_path(s.path_id).ok().flatten())
            .and_then(|p| p.verification_timeout_hours)
            .map(|hours| Duration::from_secs(u64::from(hours) * 3600))
            .unwrap_or(self.config.timeout);
        (timeout, file_path)
    }

    async fn monitor(&self, record: EventRecord) {
        let Event::SearchCompleted { media_id, arr_path, .. } = &record.event else {
            return;
        };
        let aggregate_id = record.aggregate_id.as_str();
        let (timeout, original_file) = self.timeout_for(aggregate_id);

        // Without a media id (or a usable mapping) the queue is useless;
        // fall back to watching the original path reappear on disk.
        if *media_id == 0 || self.mapper.to_local_path(arr_path).is_err() {
            self.poll_file_fallback(aggregate_id, original_file, timeout).await;
            return;
        }

        self.monitor_queue(aggregate_id, *media_id, arr_path, timeout).await;
    }

    // -- fallback: plain file polling --

    async fn poll_file_fallback(
        &self,
        aggregate_id: &str,
        original_file: Option<String>,
        timeout: Duration,
    ) {
        let Some(file) = original_file else {
            warn!(aggregate_id, "no known file path for fallback polling, dropping");
            return;
        };
        info!(aggregate_id, file = %file, "no media id; polling file directly");
        let started = self.clock.now();
        let mut attempt: u32 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let elapsed = self.clock.now().duration_since(started);
            if elapsed >= timeout {
                self.publish(
                    aggregate_id,
                    Event::DownloadTimeout {
                        elapsed_seconds: elapsed.as_secs(),
                        timeout_seconds: timeout.as_secs(),
                    },
                )
                .await;
                self.cleanup(aggregate_id);
                return;
            }
            if Path::new(&file).exists() {
                self.publish(
                    aggregate_id,
                    Event::FileDetected {
                        file_paths: vec![file.clone()],
                        partial_replacement: false,
                    },
                )
                .await;
                self.verify(aggregate_id, vec![file]).await;
                return;
            }
            let delay = backoff(self.config.interval, attempt, self.config.file_poll_cap);
            if !sleep_unless_cancelled(&self.clock, delay, &self.shutdown).await {
                return;
            }
            attempt = attempt.saturating_add(1);
        }
    }

    // -- primary: queue/history monitoring --

    async fn monitor_queue(
        &self,
        aggregate_id: &str,
        media_id: i64,
        arr_path: &str,
        timeout: Duration,
    ) {
        let started = self.clock.now();
        let mut empty_attempts: u32 = 0;
        let mut last_progress: Option<(String, i64)> = None;

        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let elapsed = self.clock.now().duration_since(started);
            if elapsed >= timeout {
                self.publish(
                    aggregate_id,
                    Event::DownloadTimeout {
                        elapsed_seconds: elapsed.as_secs(),
                        timeout_seconds: timeout.as_secs(),
                    },
                )
                .await;
                self.cleanup(aggregate_id);
                return;
            }

            let items = match tokio::time::timeout(
                ARR_CALL_TIMEOUT,
                self.arr.queue_items_by_media_id(arr_path, media_id),
            )
            .await
            {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    warn!(aggregate_id, error = %e, "queue query failed");
                    if !sleep_unless_cancelled(&self.clock, self.config.interval, &self.shutdown)
                        .await
                    {
                        return;
                    }
                    continue;
                }
                Err(_) => {
                    warn!(aggregate_id, "queue query timed out");
                    if !sleep_unless_cancelled(&self.clock, self.config.interval, &self.shutdown)
                        .await
                    {
                        return;
                    }
                    continue;
                }
            };

            match items.into_iter().next() {
                Some(item) => {
                    empty_attempts = 0;
                    if self
                        .handle_queue_item(aggregate_id, media_id, arr_path, item, &mut last_progress)
                        .await
                    {
                        return;
                    }
                    if !sleep_unless_cancelled(&self.clock, self.config.interval, &self.shutdown)
                        .await
                    {
                        return;
                    }
                }
                None => {
                    if self
                        .handle_empty_queue(aggregate_id, media_id, arr_path, elapsed, timeout)
                        .await
                    {
                        return;
                    }
                    empty_attempts = empty_attempts.saturating_add(1);
                    let delay =
                        backoff(self.config.interval, empty_attempts, self.config.queue_backoff_cap);
                    if !sleep_unless_cancelled(&self.clock, delay, &self.shutdown).await {
                        return;
                    }
                }
            }
        }
    }

    /// Returns `true` when monitoring is finished.
    async fn handle_queue_item(
        &self,
        aggregate_id: &str,
        media_id: i64,
        arr_path: &str,
        item: QueueItemInfo,
        last_progress: &mut Option<(String, i64)>,
    ) -> bool {
        let state = item.tracked_download_state.clone();
        match state {
            TrackedDownloadState::Failed | TrackedDownloadState::FailedPending => {
                self.publish(
                    aggregate_id,
                    Event::DownloadFailed {
                        error: item.error_message.unwrap_or_else(|| item.status.clone()),
                        download_id: item.download_id,
                        title: Some(item.title),
                    },
                )
                .await;
                self.cleanup(aggregate_id);
                return true;
            }
            TrackedDownloadState::Ignored => {
                self.publish(
                    aggregate_id,
                    Event::DownloadIgnored {
                        download_id: item.download_id,
                        title: Some(item.title),
                    },
                )
                .await;
                self.cleanup(aggregate_id);
                return true;
            }
            TrackedDownloadState::ImportBlocked => {
                // Edge-triggered: emit only on the transition into blocked.
                let previously_blocked = self
                    .last_state
                    .lock()
                    .get(aggregate_id)
                    .map(|s| s.as_str() == TrackedDownloadState::ImportBlocked.as_str())
                    .unwrap_or(false);
                if !previously_blocked {
                    self.publish(
                        aggregate_id,
                        Event::ImportBlocked {
                            download_id: item.download_id.clone(),
                            title: Some(item.title.clone()),
                            messages: item.status_messages.clone(),
                        },
                    )
                    .await;
                }
            }
            _ => {}
        }

        // Progress event on status or whole-percent change.
        let progress_key = (item.status.clone(), item.progress as i64);
        if last_progress.as_ref() != Some(&progress_key) {
            *last_progress = Some(progress_key);
            {
                let mut meta = self.verify_meta.lock();
                let entry = meta.entry(aggregate_id.to_string()).or_default();
                if entry.first_progress_at.is_none() {
                    entry.first_progress_at = Some(self.clock.utc_now());
                }
            }
            let warning = item.error_message.is_some() || !item.status_messages.is_empty();
            self.publish(
                aggregate_id,
                Event::DownloadProgress {
                    status: item.status.clone(),
                    progress: item.progress,
                    time_left: item.time_left.clone(),
                    download_id: item.download_id.clone(),
                    title: Some(item.title.clone()),
                    protocol: item.protocol.clone(),
                    download_client: item.download_client.clone(),
                    indexer: item.indexer.clone(),
                    size_bytes: Some(item.size),
                    size_remaining_bytes: Some(item.size_left),
                    estimated_completion: item.estimated_completion.clone(),
                    added_at: item.added_at.clone(),
                    warning,
                    warning_message: item.error_message.clone(),
                },
            )
            .await;
        }

        self.last_state
            .lock()
            .insert(aggregate_id.to_string(), state.as_str().to_string());

        if state.is_import_phase() {
            if let Some(paths) = self.confirm_import(aggregate_id, media_id, arr_path).await {
                self.publish(
                    aggregate_id,
                    Event::FileDetected { file_paths: paths.clone(), partial_replacement: false },
                )
                .await;
                self.verify(aggregate_id, paths).await;
                return true;
            }
        }
        false
    }

    /// Returns `true` when monitoring is finished.
    async fn handle_empty_queue(
        &self,
        aggregate_id: &str,
        media_id: i64,
        arr_path: &str,
        elapsed: Duration,
        timeout: Duration,
    ) -> bool {
        let seen_in_queue = self.last_state.lock().contains_key(aggregate_id);

        match self.history_with_retry(arr_path, media_id).await {
            Ok(history) => {
                if let Some(import) = history.iter().find(|h| h.is_import_event()) {
                    self.capture_meta(aggregate_id, import);
                    if let Some(paths) = self.resolve_local_files(media_id, arr_path).await {
                        let all_exist = paths.iter().all(|p| Path::new(p).exists());
                        if !paths.is_empty() && all_exist {
                            self.publish(
                                aggregate_id,
                                Event::FileDetected {
                                    file_paths: paths.clone(),
                                    partial_replacement: false,
                                },
                            )
                            .await;
                            self.verify(aggregate_id, paths).await;
                            return true;
                        }
                    }
                } else if seen_in_queue {
                    let last_status = self
                        .last_state
                        .lock()
                        .get(aggregate_id)
                        .cloned()
                        .unwrap_or_default();
                    self.publish(
                        aggregate_id,
                        Event::ManuallyRemoved { requires_manual: true, last_status },
                    )
                    .await;
                    self.cleanup(aggregate_id);
                    return true;
                }
            }
            Err(e) => {
                warn!(aggregate_id, error = %e, "history unavailable after retries");
            }
        }

        // Last resort: the arr may already track the replacement files.
        if let Some(paths) = self.resolve_local_files(media_id, arr_path).await {
            if !paths.is_empty() {
                let existing: Vec<String> =
                    paths.iter().filter(|p| Path::new(p).exists()).cloned().collect();
                if existing.len() == paths.len() {
                    self.publish(
                        aggregate_id,
                        Event::FileDetected {
                            file_paths: paths.clone(),
                            partial_replacement: false,
                        },
                    )
                    .await;
                    self.verify(aggregate_id, paths).await;
                    return true;
                }
                if !existing.is_empty() && elapsed > timeout / 2 {
                    info!(
                        aggregate_id,
                        found = existing.len(),
                        expected = paths.len(),
                        "accepting partial replacement"
                    );
                    self.publish(
                        aggregate_id,
                        Event::FileDetected {
                            file_paths: existing.clone(),
                            partial_replacement: true,
                        },
                    )
                    .await;
                    self.verify(aggregate_id, existing).await;
                    return true;
                }
            }
        }
        false
    }

    /// In-queue import confirmation: an import history event plus all
    /// expected files on disk.
    async fn confirm_import(
        &self,
        aggregate_id: &str,
        media_id: i64,
        arr_path: &str,
    ) -> Option<Vec<String>> {
        let history = self
            .arr
            .recent_history_for_media(arr_path, media_id, self.config.history_limit)
            .await
            .ok()?;
        let import = history.iter().find(|h| h.is_import_event())?;
        self.capture_meta(aggregate_id, import);
        let paths = self.resolve_local_files(media_id, arr_path).await?;
        (!paths.is_empty() && paths.iter().all(|p| Path::new(p).exists())).then_some(paths)
    }

    /// Expected replacement files, translated into the local namespace.
    async fn resolve_local_files(&self, media_id: i64, arr_path: &str) -> Option<Vec<String>> {
        let arr_paths = match tokio::time::timeout(
            ARR_CALL_TIMEOUT,
            self.arr.all_file_paths(media_id, None, arr_path),
        )
        .await
        {
            Ok(Ok(paths)) => paths,
            _ => return None,
        };
        Some(
            arr_paths
                .iter()
                .filter_map(|p| self.mapper.to_local_path(p).ok())
                .collect(),
        )
    }

    fn capture_meta(&self, aggregate_id: &str, import: &HistoryItemInfo) {
        let mut meta = self.verify_meta.lock();
        let entry = meta.entry(aggregate_id.to_string()).or_default();
        entry.quality = entry.quality.take().or_else(|| import.quality.clone());
        entry.release_group =
            entry.release_group.take().or_else(|| import.release_group.clone());
        entry.indexer = entry.indexer.take().or_else(|| import.indexer.clone());
        entry.download_client =
            entry.download_client.take().or_else(|| import.download_client.clone());
    }

    /// History fetch with bounded retries (1s/2s/4s, interruptible).
    async fn history_with_retry(
        &self,
        arr_path: &str,
        media_id: i64,
    ) -> Result<Vec<HistoryItemInfo>, remedarr_adapters::AdapterError> {
        let mut delay = Duration::from_secs(1);
        let attempts = self.config.history_retries.max(1);
        for attempt in 1..=attempts {
            match self
                .arr
                .recent_history_for_media(arr_path, media_id, self.config.history_limit)
                .await
            {
                Ok(history) => return Ok(history),
                Err(e) if attempt == attempts => return Err(e),
                Err(e) => {
                    debug!(attempt, error = %e, "history fetch failed, retrying");
                    if !sleep_unless_cancelled(&self.clock, delay, &self.shutdown).await {
                        return Err(e);
                    }
                    delay *= 2;
                }
            }
        }
        Err(remedarr_adapters::AdapterError::Api("history retries exhausted".into()))
    }

    // -- verification phase --

    async fn verify(&self, aggregate_id: &str, paths: Vec<String>) {
        self.publish(aggregate_id, Event::VerificationStarted { file_paths: paths.clone() })
            .await;

        let mut failed_paths = Vec::new();
        let mut first_error: Option<String> = None;
        for path in &paths {
            if let Err(e) = self.detector.check(Path::new(path), DetectionMode::Thorough).await {
                if first_error.is_none() {
                    first_error = Some(e.to_string());
                }
                failed_paths.push(path.clone());
            }
        }

        if failed_paths.is_empty() {
            let now = self.clock.utc_now();
            let total_duration_seconds = self
                .store
                .first_event_at(aggregate_id)
                .ok()
                .flatten()
                .map(|t| (now - t).num_seconds().max(0) as u64);
            let meta = self
                .verify_meta
                .lock()
                .get(aggregate_id)
                .cloned()
                .unwrap_or_default();
            let download_duration_seconds =
                meta.first_progress_at.map(|t| (now - t).num_seconds().max(0) as u64);
            let new_file_path = paths.first().cloned();
            let new_file_size = new_file_path
                .as_deref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map(|m| m.len() as i64);
            self.publish(
                aggregate_id,
                Event::VerificationSuccess {
                    verified_count: paths.len(),
                    total_duration_seconds,
                    download_duration_seconds,
                    quality: meta.quality,
                    release_group: meta.release_group,
                    indexer: meta.indexer,
                    download_client: meta.download_client,
                    new_file_path,
                    new_file_size,
                },
            )
            .await;
        } else {
            self.publish(
                aggregate_id,
                Event::VerificationFailed {
                    error: first_error.unwrap_or_else(|| "verification failed".into()),
                    failed_count: failed_paths.len(),
                    total_count: paths.len(),
                    failed_paths,
                },
            )
            .await;
        }
        self.cleanup(aggregate_id);
    }
}

struct Subscription<C: Clock, D: HealthDetector + 'static>(Arc<Verifier<C, D>>);

#[async_trait::async_trait]
impl<C: Clock, D: HealthDetector> Subscriber for Subscription<C, D> {
    fn name(&self) -> &'static str {
        "verifier"
    }

    async fn handle(&self, record: EventRecord) {
        if self.0.shutdown.is_cancelled() {
            return;
        }
        let this = Arc::clone(&self.0);
        self.0.tracker.spawn(async move {
            this.monitor(record).await;
        });
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
