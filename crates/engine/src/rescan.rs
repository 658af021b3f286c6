// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rescan worker: periodic reinspection of inaccessible files.
//!
//! Files that failed an infrastructure check sit in `pending_rescans` with
//! an exponential-backoff deadline. Each tick picks the due batch and runs
//! the detector again: healthy resolves the row, still-broken pushes the
//! deadline out (abandoning at the retry limit), true corruption resolves
//! the row and enters the normal remediation pipeline.

use crate::bus::EventBus;
use crate::config::RescanConfig;
use crate::error::EngineError;
use crate::time::sleep_unless_cancelled;
use remedarr_adapters::HealthDetector;
use remedarr_core::clock::Clock;
use remedarr_core::event::{AggregateType, Event};
use remedarr_core::health::DetectionConfig;
use remedarr_core::id::CorruptionId;
use remedarr_core::rescan::{rescan_backoff, PendingRescan, RescanResolution};
use remedarr_storage::Store;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct RescanWorker<C: Clock, D: HealthDetector + 'static> {
    bus: Arc<EventBus<C>>,
    store: Store,
    detector: Arc<D>,
    clock: C,
    config: RescanConfig,
    shutdown: CancellationToken,
}

impl<C: Clock, D: HealthDetector> RescanWorker<C, D> {
    pub fn new(
        bus: Arc<EventBus<C>>,
        store: Store,
        detector: Arc<D>,
        clock: C,
        config: RescanConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            store,
            detector,
            clock,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Start the background ticker.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if !sleep_unless_cancelled(&worker.clock, worker.config.tick, &worker.shutdown)
                    .await
                {
                    return;
                }
                if let Err(e) = worker.process_due().await {
                    warn!(error = %e, "rescan tick failed");
                }
            }
        })
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// One tick: reinspect the due batch. Returns how many rows were
    /// handled.
    pub async fn process_due(&self) -> Result<usize, EngineError> {
        let due = self.store.due_rescans(self.clock.utc_now(), self.config.batch)?;
        if due.is_empty() {
            return Ok(0);
        }
        debug!(count = due.len(), "reinspecting pending rescans");
        let mut handled = 0;
        for rescan in due {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.reinspect(rescan).await;
            handled += 1;
        }
        Ok(handled)
    }

    async fn reinspect(&self, rescan: PendingRescan) {
        let scan_path = self.store.scan_path(rescan.path_id).ok().flatten();
        let detection = scan_path
            .as_ref()
            .map(|p| p.detection.clone())
            .unwrap_or_else(DetectionConfig::default);

        match self
            .detector
            .check_with_config(Path::new(&rescan.file_path), &detection)
            .await
        {
            Ok(()) => {
                info!(file = %rescan.file_path, "pending rescan resolved healthy");
                if let Err(e) =
                    self.store.mark_rescan_resolved(rescan.id, RescanResolution::Healthy)
                {
                    warn!(file = %rescan.file_path, error = %e, "failed to resolve rescan");
                }
            }
            Err(error) if error.is_recoverable() => {
                let new_count = rescan.retry_count + 1;
                let abandoned = new_count >= rescan.max_retries;
                let next_retry_at = self.clock.utc_now()
                    + chrono::Duration::from_std(rescan_backoff(new_count))
                        .unwrap_or(chrono::Duration::zero());
                if abandoned {
                    info!(file = %rescan.file_path, retries = new_count, "rescan abandoned");
                }
                if let Err(e) =
                    self.store.bump_rescan_retry(rescan.id, new_count, next_retry_at, abandoned)
                {
                    warn!(file = %rescan.file_path, error = %e, "failed to bump rescan");
                }
            }
            Err(error) => {
                info!(
                    file = %rescan.file_path,
                    kind = %error.kind,
                    "pending rescan turned out corrupt"
                );
                if let Err(e) =
                    self.store.mark_rescan_resolved(rescan.id, RescanResolution::Corrupt)
                {
                    warn!(file = %rescan.file_path, error = %e, "failed to resolve rescan");
                }
                self.publish_detection(&rescan, &error).await;
            }
        }
    }

    async fn publish_detection(
        &self,
        rescan: &PendingRescan,
        error: &remedarr_core::health::HealthCheckError,
    ) {
        // Same dedup rule as the scanner.
        match self.store.recent_open_detection(
            &rescan.file_path,
            self.config.dedup_window,
            self.clock.utc_now(),
        ) {
            Ok(Some(_)) => {
                debug!(file = %rescan.file_path, "corruption already being processed");
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(file = %rescan.file_path, error = %e, "dedup query failed, publishing anyway");
            }
        }

        let policy = self.store.scan_path(rescan.path_id).ok().flatten();
        let corruption_id = CorruptionId::new();
        let event = Event::CorruptionDetected {
            file_path: rescan.file_path.clone(),
            path_id: rescan.path_id,
            corruption_type: error.kind,
            error_details: error.message.clone(),
            auto_remediate: policy.as_ref().map(|p| p.auto_remediate).unwrap_or(false),
            dry_run: policy.as_ref().map(|p| p.dry_run).unwrap_or(false),
            batch_throttled: false,
        };
        if let Err(e) =
            self.bus.publish(AggregateType::Corruption, corruption_id.as_str(), event).await
        {
            warn!(file = %rescan.file_path, error = %e, "failed to publish corruption");
        }
    }
}

#[cfg(test)]
#[path = "rescan_tests.rs"]
mod tests;
