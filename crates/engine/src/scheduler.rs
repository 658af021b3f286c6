// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven scan scheduling.
//!
//! Each enabled schedule owns one armed timer for its next fire time.
//! Firing re-reads the schedule and scan path from storage (so disabled or
//! deleted rows are honored without restart), triggers the scan, and
//! re-arms for the following occurrence. Invalid cron expressions are
//! rejected at add/update time and can never reach a timer.

use crate::error::EngineError;
use parking_lot::Mutex;
use remedarr_core::clock::{Clock, TimerHandle};
use remedarr_core::cron::CronExpr;
use remedarr_core::schedule::ScanSchedule;
use remedarr_storage::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Something that can run a scan for a scan path. Implemented by the
/// scanner; tests substitute a recorder.
#[async_trait::async_trait]
pub trait ScanTrigger: Send + Sync + 'static {
    async fn trigger_scan(&self, path_id: i64, local_path: String);
}

pub struct ScanScheduler<C: Clock> {
    store: Store,
    clock: C,
    trigger: Arc<dyn ScanTrigger>,
    jobs: Mutex<HashMap<i64, TimerHandle>>,
    running: AtomicBool,
    fire_tx: mpsc::UnboundedSender<i64>,
    drain: Mutex<Option<tokio::task::JoinHandle<()>>>,
    fire_rx: Mutex<Option<mpsc::UnboundedReceiver<i64>>>,
}

impl<C: Clock> ScanScheduler<C> {
    pub fn new(store: Store, clock: C, trigger: Arc<dyn ScanTrigger>) -> Arc<Self> {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            store,
            clock,
            trigger,
            jobs: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
            fire_tx,
            drain: Mutex::new(None),
            fire_rx: Mutex::new(Some(fire_rx)),
        })
    }

    /// Start the fire loop and load enabled schedules.
    pub fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let Some(mut fire_rx) = self.fire_rx.lock().take() else {
            return Ok(());
        };
        let scheduler = Arc::clone(self);
        let drain = tokio::spawn(async move {
            while let Some(schedule_id) = fire_rx.recv().await {
                scheduler.handle_fire(schedule_id).await;
            }
        });
        *self.drain.lock() = Some(drain);
        self.load_schedules()
    }

    /// Cancel all timers and stop the fire loop. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut jobs = self.jobs.lock();
        for (_, timer) in jobs.drain() {
            timer.cancel();
        }
        if let Some(drain) = self.drain.lock().take() {
            drain.abort();
        }
    }

    /// (Re)register every enabled schedule from storage.
    pub fn load_schedules(&self) -> Result<(), EngineError> {
        let schedules = self.store.enabled_schedules()?;
        info!(count = schedules.len(), "loading scan schedules");
        for schedule in schedules {
            if let Err(e) = self.arm(&schedule) {
                warn!(schedule_id = schedule.id, error = %e, "failed to arm schedule");
            }
        }
        Ok(())
    }

    /// Validate and persist a new schedule; arms it when running.
    pub fn add_schedule(&self, scan_path_id: i64, cron: &str) -> Result<i64, EngineError> {
        CronExpr::parse(cron)?;
        let id = self.store.insert_schedule(scan_path_id, cron, true)?;
        if self.running.load(Ordering::Acquire) {
            let schedule =
                ScanSchedule { id, scan_path_id, cron_expression: cron.to_string(), enabled: true };
            self.arm(&schedule)?;
        }
        Ok(id)
    }

    pub fn update_schedule(&self, id: i64, cron: &str, enabled: bool) -> Result<(), EngineError> {
        CronExpr::parse(cron)?;
        if self.store.schedule(id)?.is_none() {
            return Err(EngineError::ScheduleNotFound(id));
        }
        self.store.update_schedule(id, cron, enabled)?;
        self.disarm(id);
        if enabled && self.running.load(Ordering::Acquire) {
            if let Some(schedule) = self.store.schedule(id)? {
                self.arm(&schedule)?;
            }
        }
        Ok(())
    }

    pub fn delete_schedule(&self, id: i64) -> Result<(), EngineError> {
        self.store.delete_schedule(id)?;
        self.disarm(id);
        Ok(())
    }

    /// Drop schedules whose scan path no longer exists. Returns the count.
    pub fn cleanup_orphaned_schedules(&self) -> Result<usize, EngineError> {
        let removed = self.store.delete_orphaned_schedules()?;
        for id in &removed {
            self.disarm(*id);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "removed orphaned scan schedules");
        }
        Ok(removed.len())
    }

    /// Armed timers. Test hook.
    pub fn armed_count(&self) -> usize {
        self.jobs.lock().values().filter(|t| !t.is_cancelled()).count()
    }

    fn arm(&self, schedule: &ScanSchedule) -> Result<(), EngineError> {
        let expr = CronExpr::parse(&schedule.cron_expression)?;
        let now = self.clock.utc_now();
        let Some(next) = expr.next_after(now) else {
            warn!(schedule_id = schedule.id, "cron expression never fires, not arming");
            return Ok(());
        };
        let delay = (next - now).to_std().unwrap_or_default();
        let tx = self.fire_tx.clone();
        let schedule_id = schedule.id;
        let timer = self.clock.after(
            delay,
            Box::new(move || {
                let _ = tx.send(schedule_id);
            }),
        );
        let mut jobs = self.jobs.lock();
        if let Some(previous) = jobs.insert(schedule_id, timer) {
            previous.cancel();
        }
        Ok(())
    }

    fn disarm(&self, id: i64) {
        if let Some(timer) = self.jobs.lock().remove(&id) {
            timer.cancel();
        }
    }

    async fn handle_fire(&self, schedule_id: i64) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        // Re-read the row: it may have been disabled or deleted since arming.
        let schedule = match self.store.schedule(schedule_id) {
            Ok(Some(s)) if s.enabled => s,
            Ok(_) => {
                self.disarm(schedule_id);
                return;
            }
            Err(e) => {
                warn!(schedule_id, error = %e, "failed to read schedule on fire");
                return;
            }
        };

        match self.store.scan_path(schedule.scan_path_id) {
            Ok(Some(path)) if path.enabled => {
                info!(
                    schedule_id,
                    path_id = path.id,
                    path = %path.local_path,
                    "scheduled scan firing"
                );
                self.trigger.trigger_scan(path.id, path.local_path.clone()).await;
            }
            Ok(_) => {
                warn!(schedule_id, "schedule references a missing or disabled scan path");
            }
            Err(e) => {
                warn!(schedule_id, error = %e, "failed to read scan path on fire");
            }
        }

        // Arm the next occurrence.
        if let Err(e) = self.arm(&schedule) {
            warn!(schedule_id, error = %e, "failed to re-arm schedule");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
