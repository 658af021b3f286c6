// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup event replay.
//!
//! A crash between the log write and the handler call leaves a
//! `CorruptionDetected` persisted with no subsequent event. At startup,
//! after subscriptions are attached, those orphans are redelivered to the
//! in-memory subscribers, without re-persisting, so replay is idempotent
//! across repeated crashes.

use crate::bus::EventBus;
use crate::error::EngineError;
use remedarr_core::clock::Clock;
use remedarr_storage::Store;
use std::sync::Arc;
use tracing::info;

pub struct ReplayService<C: Clock> {
    bus: Arc<EventBus<C>>,
    store: Store,
}

impl<C: Clock> ReplayService<C> {
    pub fn new(bus: Arc<EventBus<C>>, store: Store) -> Self {
        Self { bus, store }
    }

    /// Redeliver unhandled detections. Returns how many were replayed.
    pub async fn run(&self) -> Result<usize, EngineError> {
        let orphans = self.store.unhandled_detections()?;
        if orphans.is_empty() {
            return Ok(0);
        }
        info!(count = orphans.len(), "replaying unhandled corruption detections");
        let count = orphans.len();
        for record in orphans {
            self.bus.republish(&record).await;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
