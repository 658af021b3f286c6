// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remediator: deletion and replacement search.
//!
//! Subscribes to `CorruptionDetected` and `RetryScheduled`. The only side
//! effects are arr API calls; the local filesystem is never touched. A
//! counting semaphore bounds concurrent deletion+search operations; each
//! event is handled on its own task so a slow arr never stalls the scanner.

use crate::bus::{EventBus, Subscriber};
use crate::error::EngineError;
use remedarr_adapters::{ArrClient, MediaDetails, PathMapper};
use remedarr_core::clock::Clock;
use remedarr_core::event::{AggregateType, Event, EventKind, EventRecord};
use remedarr_storage::Store;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Concurrent deletion+search operations.
pub const MAX_CONCURRENT_REMEDIATIONS: usize = 5;

pub struct Remediator<C: Clock> {
    bus: Arc<EventBus<C>>,
    store: Store,
    arr: Arc<dyn ArrClient>,
    mapper: Arc<PathMapper>,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<C: Clock> Remediator<C> {
    pub fn new(
        bus: Arc<EventBus<C>>,
        store: Store,
        arr: Arc<dyn ArrClient>,
        mapper: Arc<PathMapper>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            store,
            arr,
            mapper,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REMEDIATIONS)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Attach to the bus. Call during startup.
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus<C>) {
        let subscription: Arc<dyn Subscriber> = Arc::new(Subscription(Arc::clone(self)));
        bus.subscribe(EventKind::CorruptionDetected, Arc::clone(&subscription));
        bus.subscribe(EventKind::RetryScheduled, subscription);
    }

    /// Stop accepting work and wait for in-flight remediations.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Number of permits currently taken. Test hook for the concurrency cap.
    pub fn in_flight(&self) -> usize {
        MAX_CONCURRENT_REMEDIATIONS - self.semaphore.available_permits()
    }

    async fn publish(&self, aggregate_id: &str, event: Event) {
        if let Err(e) =
            self.bus.publish(AggregateType::Corruption, aggregate_id, event).await
        {
            warn!(aggregate_id, error = %e, "failed to publish remediation event");
        }
    }

    async fn handle_detected(&self, record: EventRecord) {
        let Event::CorruptionDetected {
            file_path,
            corruption_type,
            auto_remediate,
            dry_run,
            ..
        } = &record.event
        else {
            return;
        };
        let aggregate_id = record.aggregate_id.as_str();

        if file_path.is_empty() {
            warn!(aggregate_id, "corruption event without file path, dropping");
            return;
        }

        let arr_path = match self.mapper.to_arr_path(file_path) {
            Ok(p) => p,
            Err(e) => {
                self.publish(
                    aggregate_id,
                    Event::DeletionFailed {
                        file_path: file_path.clone(),
                        error: format!("path translation failed: {e}"),
                    },
                )
                .await;
                return;
            }
        };

        self.publish(
            aggregate_id,
            Event::RemediationQueued {
                file_path: file_path.clone(),
                dry_run: false,
                media_id: None,
                note: None,
            },
        )
        .await;

        // Infrastructure errors must never delete anything.
        if corruption_type.is_recoverable() {
            self.publish(
                aggregate_id,
                Event::DeletionFailed {
                    file_path: file_path.clone(),
                    error: format!(
                        "infrastructure issue ({corruption_type}), not eligible for deletion"
                    ),
                },
            )
            .await;
            return;
        }

        if !auto_remediate {
            info!(aggregate_id, file = %file_path, "auto-remediate disabled, stopping");
            return;
        }

        if *dry_run {
            let media_id = self.arr.find_media_by_path(&arr_path).await.ok();
            info!(aggregate_id, file = %file_path, ?media_id, "dry run, no mutation");
            self.publish(
                aggregate_id,
                Event::RemediationQueued {
                    file_path: file_path.clone(),
                    dry_run: true,
                    media_id,
                    note: Some("would delete file and trigger search".into()),
                },
            )
            .await;
            return;
        }

        self.remediate(aggregate_id, file_path, &arr_path).await;
    }

    /// Full deletion+search flow, under the semaphore.
    async fn remediate(&self, aggregate_id: &str, file_path: &str, arr_path: &str) {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return;
        };

        let media_id = match self.arr.find_media_by_path(arr_path).await {
            Ok(id) => id,
            Err(e) => {
                self.publish(
                    aggregate_id,
                    Event::DeletionFailed {
                        file_path: file_path.to_string(),
                        error: format!("media lookup failed: {e}"),
                    },
                )
                .await;
                return;
            }
        };

        self.publish(
            aggregate_id,
            Event::DeletionStarted {
                file_path: file_path.to_string(),
                arr_path: arr_path.to_string(),
                media_id,
            },
        )
        .await;

        let episode_ids = match self.arr.delete_file(media_id, arr_path).await {
            Ok(response) => response.episode_ids,
            Err(e) => {
                self.publish(
                    aggregate_id,
                    Event::DeletionFailed {
                        file_path: file_path.to_string(),
                        error: e.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        self.publish(
            aggregate_id,
            Event::DeletionCompleted {
                file_path: file_path.to_string(),
                arr_path: arr_path.to_string(),
                media_id,
                episode_ids: episode_ids.clone(),
            },
        )
        .await;

        self.search(aggregate_id, media_id, arr_path, &episode_ids).await;
    }

    /// Trigger a replacement search and publish the enriched completion.
    async fn search(&self, aggregate_id: &str, media_id: i64, arr_path: &str, episode_ids: &[i64]) {
        self.publish(aggregate_id, Event::SearchStarted { media_id }).await;

        if let Err(e) = self.arr.trigger_search(media_id, arr_path, episode_ids).await {
            self.publish(
                aggregate_id,
                Event::SearchFailed { media_id, error: e.to_string() },
            )
            .await;
            return;
        }

        let details = self.arr.media_details(media_id, arr_path).await.ok();
        self.publish(
            aggregate_id,
            search_completed_event(media_id, arr_path, details.as_ref(), episode_ids),
        )
        .await;
    }

    /// On retry, a prior successful deletion means we skip straight to the
    /// search with the recorded media id and metadata.
    async fn handle_retry(&self, record: EventRecord) {
        let Event::RetryScheduled { file_path, path_id, .. } = &record.event else {
            return;
        };
        let aggregate_id = record.aggregate_id.as_str();

        let prior = match self.store.prior_deletion_completed(aggregate_id) {
            Ok(prior) => prior,
            Err(e) => {
                warn!(aggregate_id, error = %e, "failed to look up prior deletion");
                None
            }
        };
        if let Some(prior) = prior {
            if let Event::DeletionCompleted { arr_path, media_id, episode_ids, .. } = prior.event
            {
                info!(aggregate_id, media_id, "retry: deletion already done, searching again");
                let Ok(_permit) = self.semaphore.acquire().await else {
                    return;
                };
                self.search(aggregate_id, media_id, &arr_path, &episode_ids).await;
                return;
            }
        }

        // No deletion on record: run the full flow under the current
        // scan-path policy.
        let policy = self.store.scan_path(*path_id).ok().flatten();
        let auto_remediate = policy.as_ref().map(|p| p.auto_remediate).unwrap_or(true);
        let dry_run = policy.as_ref().map(|p| p.dry_run).unwrap_or(false);

        if !auto_remediate {
            info!(aggregate_id, "retry: auto-remediate now disabled, stopping");
            return;
        }

        let arr_path = match self.mapper.to_arr_path(file_path) {
            Ok(p) => p,
            Err(e) => {
                self.publish(
                    aggregate_id,
                    Event::DeletionFailed {
                        file_path: file_path.clone(),
                        error: format!("path translation failed: {e}"),
                    },
                )
                .await;
                return;
            }
        };

        if dry_run {
            let media_id = self.arr.find_media_by_path(&arr_path).await.ok();
            self.publish(
                aggregate_id,
                Event::RemediationQueued {
                    file_path: file_path.clone(),
                    dry_run: true,
                    media_id,
                    note: Some("retry would delete file and trigger search".into()),
                },
            )
            .await;
            return;
        }

        self.remediate(aggregate_id, file_path, &arr_path).await;
    }
}

/// Build `SearchCompleted`, omitting zero/empty enrichment fields.
fn search_completed_event(
    media_id: i64,
    arr_path: &str,
    details: Option<&MediaDetails>,
    episode_ids: &[i64],
) -> Event {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    let non_zero = |v: i32| (v != 0).then_some(v);
    match details {
        Some(d) => Event::SearchCompleted {
            media_id,
            arr_path: arr_path.to_string(),
            title: non_empty(&d.title),
            year: non_zero(d.year),
            media_type: non_empty(&d.media_type),
            instance: non_empty(&d.instance),
            season: non_zero(d.season),
            episode: non_zero(d.episode),
            episode_title: non_empty(&d.episode_title),
            episode_ids: episode_ids.to_vec(),
        },
        None => Event::SearchCompleted {
            media_id,
            arr_path: arr_path.to_string(),
            title: None,
            year: None,
            media_type: None,
            instance: None,
            season: None,
            episode: None,
            episode_title: None,
            episode_ids: episode_ids.to_vec(),
        },
    }
}

/// Bus-facing handle. Deliveries spawn onto the remediator's task tracker
/// so a slow arr call never stalls the publisher; per-aggregate ordering
/// holds because each aggregate sees at most one remediation-triggering
/// event at a time.
struct Subscription<C: Clock>(Arc<Remediator<C>>);

#[async_trait::async_trait]
impl<C: Clock> Subscriber for Subscription<C> {
    fn name(&self) -> &'static str {
        "remediator"
    }

    async fn handle(&self, record: EventRecord) {
        if self.0.shutdown.is_cancelled() {
            return;
        }
        let this = Arc::clone(&self.0);
        self.0.tracker.spawn(async move {
            match record.kind() {
                EventKind::CorruptionDetected => this.handle_detected(record).await,
                EventKind::RetryScheduled => this.handle_retry(record).await,
                _ => {}
            }
        });
    }
}

#[cfg(test)]
#[path = "remediator_tests.rs"]
mod tests;
