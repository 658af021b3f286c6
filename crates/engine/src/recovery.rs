// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery: reconcile aggregates stuck in in-progress states.
//!
//! Runs once, after subscriptions are attached and event replay has
//! finished. Each stale projection row is routed by state class: post-search
//! states are checked against the arr queue and disk, early remediation
//! states re-enter the pipeline, failed states are settled against the
//! retry budget. Every repair goes through the bus so the downstream
//! services pick the aggregate back up.

use crate::bus::EventBus;
use crate::config::RecoveryConfig;
use crate::error::EngineError;
use remedarr_adapters::{ArrClient, HealthDetector, PathMapper};
use remedarr_core::clock::Clock;
use remedarr_core::corruption::{CorruptionState, CorruptionStatus, StateClass};
use remedarr_core::event::{AggregateType, Event};
use remedarr_core::health::DetectionMode;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Bound on individual arr calls during recovery.
const RECOVERY_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-item outcomes, aggregated into one startup log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub recovered: usize,
    pub exhausted: usize,
    pub skipped: usize,
}

enum Outcome {
    Recovered,
    Exhausted,
    Skipped,
}

pub struct RecoveryService<C: Clock, D: HealthDetector + 'static> {
    bus: Arc<EventBus<C>>,
    store: remedarr_storage::Store,
    arr: Arc<dyn ArrClient>,
    mapper: Arc<PathMapper>,
    detector: Arc<D>,
    clock: C,
    config: RecoveryConfig,
}

impl<C: Clock, D: HealthDetector> RecoveryService<C, D> {
    pub fn new(
        bus: Arc<EventBus<C>>,
        store: remedarr_storage::Store,
        arr: Arc<dyn ArrClient>,
        mapper: Arc<PathMapper>,
        detector: Arc<D>,
        clock: C,
        config: RecoveryConfig,
    ) -> Self {
        Self { bus, store, arr, mapper, detector, clock, config }
    }

    /// Reconcile every stale in-progress aggregate.
    pub async fn run(&self) -> Result<RecoverySummary, EngineError> {
        let stale = self
            .store
            .stale_corruptions(self.config.stale_threshold, self.clock.utc_now())?;
        let mut summary = RecoverySummary::default();
        for item in stale {
            let outcome = self.recover_item(&item).await;
            match outcome {
                Outcome::Recovered => summary.recovered += 1,
                Outcome::Exhausted => summary.exhausted += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        info!(
            recovered = summary.recovered,
            exhausted = summary.exhausted,
            skipped = summary.skipped,
            "startup recovery finished"
        );
        Ok(summary)
    }

    async fn recover_item(&self, item: &CorruptionStatus) -> Outcome {
        let Some(class) = item.current_state.stale_class() else {
            return Outcome::Skipped;
        };
        info!(
            aggregate_id = %item.corruption_id,
            state = %item.current_state,
            file = %item.file_path,
            "recovering stale aggregate"
        );
        match class {
            StateClass::PostSearch => self.recover_post_search(item).await,
            StateClass::EarlyRemediation => self.recover_early(item).await,
            StateClass::Failed => self.recover_failed(item).await,
        }
    }

    // A search was running: the arr may still be working, may have finished
    // while we were down, or the item may have vanished entirely.
    async fn recover_post_search(&self, item: &CorruptionStatus) -> Outcome {
        let arr_path = self.mapper.to_arr_path(&item.file_path).ok();

        if let (Some(media_id), Some(arr_path)) = (item.media_id, arr_path.as_deref()) {
            // Still in the queue: leave it to the normal verifier flow.
            match timeout(
                RECOVERY_CALL_TIMEOUT,
                self.arr.queue_items_by_media_id(arr_path, media_id),
            )
            .await
            {
                Ok(Ok(items)) if !items.is_empty() => {
                    info!(aggregate_id = %item.corruption_id, "download still active, skipping");
                    return Outcome::Skipped;
                }
                Ok(Ok(_)) => {}
                _ => {
                    warn!(aggregate_id = %item.corruption_id, "queue check failed during recovery");
                }
            }

            // Files the arr already tracks.
            let files = match timeout(
                RECOVERY_CALL_TIMEOUT,
                self.arr.all_file_paths(media_id, None, arr_path),
            )
            .await
            {
                Ok(Ok(files)) => files,
                _ => Vec::new(),
            };
            for file in files {
                let Ok(local) = self.mapper.to_local_path(&file) else {
                    continue;
                };
                if !Path::new(&local).exists() {
                    continue;
                }
                return match self.detector.check(Path::new(&local), DetectionMode::Thorough).await
                {
                    Ok(()) => {
                        self.publish_success(item, &local).await;
                        Outcome::Recovered
                    }
                    Err(_) => {
                        self.publish(
                            item,
                            Event::SearchExhausted { reason: "file_corrupt".into() },
                        )
                        .await;
                        Outcome::Exhausted
                    }
                };
            }
        }

        // Nothing in the arr; maybe the replacement landed at the original
        // path while we were down.
        if Path::new(&item.file_path).exists()
            && self
                .detector
                .check(Path::new(&item.file_path), DetectionMode::Thorough)
                .await
                .is_ok()
        {
            self.publish_success(item, &item.file_path).await;
            return Outcome::Recovered;
        }

        self.publish(item, Event::SearchExhausted { reason: "item_vanished".into() }).await;
        Outcome::Exhausted
    }

    // Remediation began but no search was confirmed.
    async fn recover_early(&self, item: &CorruptionStatus) -> Outcome {
        match item.current_state {
            CorruptionState::DeletionStarted => {
                // The deletion may never have happened; if the file is still
                // there and healthy, the aggregate resolves itself.
                if Path::new(&item.file_path).exists()
                    && self
                        .detector
                        .check(Path::new(&item.file_path), DetectionMode::Thorough)
                        .await
                        .is_ok()
                {
                    self.publish_success(item, &item.file_path).await;
                    return Outcome::Recovered;
                }
                self.publish_retry(item).await;
                Outcome::Recovered
            }
            CorruptionState::DeletionCompleted => match item.media_id {
                Some(media_id) => {
                    let arr_path =
                        self.mapper.to_arr_path(&item.file_path).unwrap_or_default();
                    self.publish(item, Event::SearchStarted { media_id }).await;
                    match timeout(
                        RECOVERY_CALL_TIMEOUT,
                        self.arr.trigger_search(media_id, &arr_path, &[]),
                    )
                    .await
                    {
                        Ok(Ok(())) => {
                            self.publish(
                                item,
                                Event::SearchCompleted {
                                    media_id,
                                    arr_path,
                                    title: None,
                                    year: None,
                                    media_type: None,
                                    instance: None,
                                    season: None,
                                    episode: None,
                                    episode_title: None,
                                    episode_ids: vec![],
                                },
                            )
                            .await;
                        }
                        Ok(Err(e)) => {
                            self.publish(
                                item,
                                Event::SearchFailed { media_id, error: e.to_string() },
                            )
                            .await;
                        }
                        Err(_) => {
                            self.publish(
                                item,
                                Event::SearchFailed {
                                    media_id,
                                    error: "search timed out during recovery".into(),
                                },
                            )
                            .await;
                        }
                    }
                    Outcome::Recovered
                }
                None => {
                    // Deleted but no media id on record: the retry re-runs
                    // the full flow, which re-resolves the media id.
                    warn!(
                        aggregate_id = %item.corruption_id,
                        tracked_warning = "deletion_completed_without_media_id",
                        "recovering deletion without media id via retry"
                    );
                    self.publish_retry(item).await;
                    Outcome::Recovered
                }
            },
            _ => {
                // RemediationQueued: just run it again.
                self.publish_retry(item).await;
                Outcome::Recovered
            }
        }
    }

    // The last transition was a failure; settle it against the retry budget.
    async fn recover_failed(&self, item: &CorruptionStatus) -> Outcome {
        let max_retries = self
            .store
            .scan_path(item.path_id)
            .ok()
            .flatten()
            .map(|p| p.max_retries)
            .unwrap_or(self.config.default_max_retries);
        if item.retry_count < max_retries {
            self.publish_retry(item).await;
            Outcome::Recovered
        } else {
            self.publish(
                item,
                Event::MaxRetriesReached {
                    retry_count: item.retry_count,
                    max_retries,
                    original_state: item.current_state.to_string(),
                },
            )
            .await;
            Outcome::Exhausted
        }
    }

    async fn publish_retry(&self, item: &CorruptionStatus) {
        self.publish(
            item,
            Event::RetryScheduled {
                file_path: item.file_path.clone(),
                path_id: item.path_id,
                original_state: item.current_state.to_string(),
            },
        )
        .await;
    }

    async fn publish_success(&self, item: &CorruptionStatus, verified_path: &str) {
        let new_file_size = std::fs::metadata(verified_path).ok().map(|m| m.len() as i64);
        self.publish(
            item,
            Event::VerificationSuccess {
                verified_count: 1,
                total_duration_seconds: None,
                download_duration_seconds: None,
                quality: None,
                release_group: None,
                indexer: None,
                download_client: None,
                new_file_path: Some(verified_path.to_string()),
                new_file_size,
            },
        )
        .await;
    }

    async fn publish(&self, item: &CorruptionStatus, event: Event) {
        if let Err(e) = self
            .bus
            .publish(AggregateType::Corruption, item.corruption_id.as_str(), event)
            .await
        {
            warn!(aggregate_id = %item.corruption_id, error = %e, "recovery publish failed");
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
