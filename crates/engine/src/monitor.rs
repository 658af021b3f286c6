// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The retry monitor: converts failures into scheduled retries.
//!
//! Subscribes to every failure kind. Each failure either arms a timer that
//! publishes `RetryScheduled` after an exponential backoff, or ends the
//! aggregate with `MaxRetriesReached`. All timers go through the [`Clock`]
//! so tests drive the schedule deterministically.

use crate::bus::{EventBus, Subscriber};
use crate::config::MonitorConfig;
use crate::time::backoff;
use parking_lot::Mutex;
use remedarr_core::clock::{Clock, TimerHandle};
use remedarr_core::corruption::{CorruptionState, CorruptionStatus};
use remedarr_core::event::{
    AggregateType, Event, EventKind, EventRecord, FAILURE_KINDS, NEEDS_ATTENTION_KINDS,
};
use remedarr_storage::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

struct PendingRetry {
    aggregate_id: String,
    event: Event,
}

pub struct RetryMonitor<C: Clock> {
    bus: Arc<EventBus<C>>,
    store: Store,
    clock: C,
    config: MonitorConfig,
    timers: Arc<Mutex<HashMap<String, TimerHandle>>>,
    stopped: AtomicBool,
    retry_tx: mpsc::UnboundedSender<PendingRetry>,
    drain: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<C: Clock> RetryMonitor<C> {
    /// Build the monitor and start its retry-publishing task.
    pub fn new(bus: Arc<EventBus<C>>, store: Store, clock: C, config: MonitorConfig) -> Arc<Self> {
        let (retry_tx, mut retry_rx) = mpsc::unbounded_channel::<PendingRetry>();
        let monitor = Arc::new(Self {
            bus: Arc::clone(&bus),
            store,
            clock,
            config,
            timers: Arc::new(Mutex::new(HashMap::new())),
            stopped: AtomicBool::new(false),
            retry_tx,
            drain: Mutex::new(None),
        });

        // Timer callbacks are synchronous; they hand the due retry to this
        // task, which owns the async publish.
        let drain_bus = bus;
        let drain = tokio::spawn(async move {
            while let Some(pending) = retry_rx.recv().await {
                if let Err(e) = drain_bus
                    .publish(AggregateType::Corruption, &pending.aggregate_id, pending.event)
                    .await
                {
                    warn!(
                        aggregate_id = %pending.aggregate_id,
                        error = %e,
                        "failed to publish scheduled retry"
                    );
                }
            }
        });
        *monitor.drain.lock() = Some(drain);
        monitor
    }

    /// Attach to every failure and needs-attention kind.
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus<C>) {
        let subscription: Arc<dyn Subscriber> = Arc::new(Subscription(Arc::clone(self)));
        for kind in FAILURE_KINDS.iter().chain(NEEDS_ATTENTION_KINDS) {
            bus.subscribe(*kind, Arc::clone(&subscription));
        }
    }

    /// Stop scheduling and cancel all pending timers. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut timers = self.timers.lock();
        for (_, timer) in timers.drain() {
            timer.cancel();
        }
        if let Some(drain) = self.drain.lock().take() {
            drain.abort();
        }
    }

    /// Timers currently armed. Test hook.
    pub fn pending_retries(&self) -> usize {
        self.timers.lock().values().filter(|t| !t.is_cancelled()).count()
    }

    async fn on_failure(&self, record: EventRecord) {
        let aggregate_id = record.aggregate_id.as_str();

        // Reconstruct context from the log, not the projection: the
        // projection is a cache and this decides whether remediation ends.
        let records = match self.store.events_for_aggregate(aggregate_id) {
            Ok(records) => records,
            Err(e) => {
                warn!(aggregate_id, error = %e, "failed to load aggregate, dropping failure");
                return;
            }
        };
        let Some(status) = CorruptionStatus::replay(records.iter()) else {
            warn!(aggregate_id, "failure event without corruption context, dropping");
            return;
        };

        // The triggering failure is already persisted; prior failures
        // exclude it.
        let prior_failures = match self.store.count_failure_events(aggregate_id) {
            Ok(count) => count.saturating_sub(1),
            Err(e) => {
                warn!(aggregate_id, error = %e, "failed to count failures, dropping");
                return;
            }
        };

        let max_retries = self
            .store
            .scan_path(status.path_id)
            .ok()
            .flatten()
            .map(|p| p.max_retries)
            .unwrap_or(self.config.default_max_retries);

        let original_state = CorruptionState::from_kind(record.kind())
            .map(|s| s.to_string())
            .unwrap_or_else(|| record.kind().as_str().to_string());
        if prior_failures >= max_retries {
            info!(
                aggregate_id,
                retry_count = prior_failures,
                max_retries,
                "retry budget exhausted"
            );
            // The aggregate is terminal; a timer armed by an earlier
            // failure must not resurrect it.
            if let Some(timer) = self.timers.lock().remove(aggregate_id) {
                timer.cancel();
            }
            if let Err(e) = self
                .bus
                .publish(
                    AggregateType::Corruption,
                    aggregate_id,
                    Event::MaxRetriesReached {
                        retry_count: prior_failures,
                        max_retries,
                        original_state: original_state.clone(),
                    },
                )
                .await
            {
                warn!(aggregate_id, error = %e, "failed to publish MaxRetriesReached");
            }
            return;
        }

        let delay = backoff(self.config.base_delay, prior_failures, self.config.max_delay);
        info!(
            aggregate_id,
            retry_count = prior_failures,
            delay_secs = delay.as_secs(),
            from = %original_state,
            "scheduling retry"
        );

        let retry = Event::RetryScheduled {
            file_path: status.file_path.clone(),
            path_id: status.path_id,
            original_state: original_state.clone(),
        };
        let tx = self.retry_tx.clone();
        let id_for_cb = aggregate_id.to_string();
        let timers_for_cb = Arc::clone(&self.timers);
        let timer = self.clock.after(
            delay,
            Box::new(move || {
                timers_for_cb.lock().remove(&id_for_cb);
                let _ = tx.send(PendingRetry { aggregate_id: id_for_cb, event: retry });
            }),
        );

        let mut timers = self.timers.lock();
        if let Some(previous) = timers.insert(aggregate_id.to_string(), timer) {
            previous.cancel();
        }
    }
}

struct Subscription<C: Clock>(Arc<RetryMonitor<C>>);

#[async_trait::async_trait]
impl<C: Clock> Subscriber for Subscription<C> {
    fn name(&self) -> &'static str {
        "retry-monitor"
    }

    async fn handle(&self, record: EventRecord) {
        let monitor = &self.0;
        if monitor.stopped.load(Ordering::Acquire) {
            return;
        }
        let kind = record.kind();
        if kind.needs_attention() {
            info!(
                aggregate_id = %record.aggregate_id,
                event = %record.event.log_summary(),
                "aggregate needs attention"
            );
            return;
        }
        if kind.is_failure() {
            monitor.on_failure(record).await;
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
