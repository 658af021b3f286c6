// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus: persist, then fan out.
//!
//! `publish` writes the event to the log first and only then delivers it,
//! so a subscriber can never observe an event that is not durable.
//! Delivery is sequential on the publisher's task, which preserves
//! per-aggregate ordering; subscribers that need concurrency spawn their
//! own tasks. A panicking subscriber is isolated (delivery runs in a
//! spawned task) and never affects the other subscribers or the caller.

use crate::error::EngineError;
use parking_lot::RwLock;
use remedarr_core::clock::Clock;
use remedarr_core::event::{AggregateType, Event, EventKind, EventRecord};
use remedarr_storage::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// An event handler attached to exactly one [`EventKind`].
#[async_trait::async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Name used in delivery logs.
    fn name(&self) -> &'static str;

    /// Handle one delivered event. Errors are the subscriber's own business;
    /// log and move on; the event is already durable.
    async fn handle(&self, record: EventRecord);
}

pub struct EventBus<C: Clock> {
    store: Store,
    clock: C,
    subscribers: RwLock<HashMap<EventKind, Vec<Arc<dyn Subscriber>>>>,
    shutting_down: AtomicBool,
    in_flight: AtomicUsize,
    drained: tokio::sync::Notify,
}

impl<C: Clock> EventBus<C> {
    pub fn new(store: Store, clock: C) -> Self {
        Self {
            store,
            clock,
            subscribers: RwLock::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            drained: tokio::sync::Notify::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Register a handler for one event kind. Attach subscribers during
    /// startup, before runtime traffic.
    pub fn subscribe(&self, kind: EventKind, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.write().entry(kind).or_default().push(subscriber);
    }

    /// Persist `event`, then deliver it. Persistence failures propagate to
    /// the caller and nothing is delivered; subscriber failures do not.
    pub async fn publish(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        event: Event,
    ) -> Result<EventRecord, EngineError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(EngineError::ShuttingDown);
        }
        let record = self.store.append_event(
            aggregate_type,
            aggregate_id,
            &event,
            None,
            self.clock.utc_now(),
        )?;
        debug!(aggregate_id, event = %record.event.log_summary(), "published");
        self.fan_out(&record).await;
        Ok(record)
    }

    /// Deliver an already-persisted record to subscribers without writing
    /// anything. Startup replay only: using this on the hot path would
    /// break the persist-before-publish guarantee for new events.
    pub async fn republish(&self, record: &EventRecord) {
        self.fan_out(record).await;
    }

    /// Deliver a transient event that is never persisted (scan progress).
    pub async fn emit_transient(
        &self,
        aggregate_type: AggregateType,
        aggregate_id: &str,
        event: Event,
    ) {
        let record =
            EventRecord::transient(aggregate_type, aggregate_id, event, self.clock.utc_now());
        self.fan_out(&record).await;
    }

    async fn fan_out(&self, record: &EventRecord) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let subs: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .get(&record.kind())
            .cloned()
            .unwrap_or_default();

        for sub in subs {
            let name = sub.name();
            let delivery = record.clone();
            // Spawned so a panic is contained in the JoinError instead of
            // unwinding through the publisher.
            let handle = tokio::spawn(async move { sub.handle(delivery).await });
            if let Err(join_err) = handle.await {
                if join_err.is_panic() {
                    error!(
                        subscriber = name,
                        event = %record.event.log_summary(),
                        "subscriber panicked during delivery"
                    );
                }
            }
        }

        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Refuse new publishes and wait briefly for in-flight deliveries.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.in_flight.load(Ordering::Acquire) > 0 {
            let notified = self.drained.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!("event bus shutdown grace expired with deliveries in flight");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
