// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Every time-dependent service goes through [`Clock`] so that retry backoff
//! and scheduling tests can run against [`FakeClock`] instead of racing real
//! timers. `after` is the scheduling primitive: it arms a one-shot timer that
//! invokes the callback at expiry unless the returned handle is cancelled.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One-shot timer callback.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// A clock that provides the current time and one-shot timers.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn utc_now(&self) -> DateTime<Utc>;
    /// Arm a one-shot timer. The callback runs at expiry unless the handle
    /// is cancelled first.
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

#[derive(Default)]
struct TimerShared {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

/// Handle to a pending timer armed via [`Clock::after`].
#[derive(Clone)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    /// Cancel the timer. The callback will not run; cancelling an
    /// already-fired or already-cancelled timer is a no-op.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle").field("cancelled", &self.is_cancelled()).finish()
    }
}

/// Real system clock. Timers run on detached threads.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let shared = Arc::new(TimerShared::default());
        let handle = TimerHandle { shared: Arc::clone(&shared) };
        std::thread::spawn(move || {
            let deadline = Instant::now() + delay;
            {
                let mut guard = shared.lock.lock();
                loop {
                    if shared.cancelled.load(Ordering::Acquire) {
                        return;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    shared.cond.wait_for(&mut guard, deadline - now);
                }
            }
            if !shared.cancelled.load(Ordering::Acquire) {
                callback();
            }
        });
        handle
    }
}

struct PendingTimer {
    deadline: Instant,
    callback: TimerCallback,
    shared: Arc<TimerShared>,
}

struct FakeClockState {
    now: Instant,
    utc: DateTime<Utc>,
    pending: Vec<PendingTimer>,
}

/// Fake clock for testing with controllable time.
///
/// Timers armed via `after` never fire on their own; tests drive them with
/// [`FakeClock::advance`] or [`FakeClock::fire_all`]. Callbacks run
/// synchronously on the advancing thread, in deadline order.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                // Fixed origin so persisted timestamps are deterministic.
                utc: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
                pending: Vec::new(),
            })),
        }
    }

    /// Advance the clock by the given duration, firing every due timer.
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut state = self.inner.lock();
            state.now += duration;
            let now = state.now;
            state.utc += chrono::Duration::from_std(duration).unwrap_or_default();
            Self::take_due(&mut state.pending, Some(now))
        };
        Self::run(due);
    }

    /// Fire every pending timer regardless of deadline.
    pub fn fire_all(&self) {
        let due = {
            let mut state = self.inner.lock();
            Self::take_due(&mut state.pending, None)
        };
        Self::run(due);
    }

    /// Number of armed, not-yet-cancelled timers.
    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .pending
            .iter()
            .filter(|t| !t.shared.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Set the wall-clock time reported by `utc_now`.
    pub fn set_utc(&self, utc: DateTime<Utc>) {
        self.inner.lock().utc = utc;
    }

    fn take_due(pending: &mut Vec<PendingTimer>, cutoff: Option<Instant>) -> Vec<PendingTimer> {
        let mut due = Vec::new();
        let mut remaining = Vec::new();
        for timer in pending.drain(..) {
            if timer.shared.cancelled.load(Ordering::Acquire) {
                continue;
            }
            match cutoff {
                Some(now) if timer.deadline > now => remaining.push(timer),
                _ => due.push(timer),
            }
        }
        *pending = remaining;
        due.sort_by_key(|t| t.deadline);
        due
    }

    // Callbacks run outside the state lock so they may arm new timers.
    fn run(due: Vec<PendingTimer>) {
        for timer in due {
            (timer.callback)();
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().utc
    }

    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let shared = Arc::new(TimerShared::default());
        let handle = TimerHandle { shared: Arc::clone(&shared) };
        let mut state = self.inner.lock();
        let deadline = state.now + delay;
        state.pending.push(PendingTimer { deadline, callback, shared });
        handle
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
