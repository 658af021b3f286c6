// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording subscriber for tests: collects every delivered record.

use crate::bus::Subscriber;
use parking_lot::Mutex;
use remedarr_core::event::{EventKind, EventRecord};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.records.lock().iter().map(|r| r.kind()).collect()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait::async_trait]
impl Subscriber for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(&self, record: EventRecord) {
        self.records.lock().push(record);
    }
}
