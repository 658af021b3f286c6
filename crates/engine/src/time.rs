// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock-driven async sleeps and backoff arithmetic.
//!
//! Every engine wait goes through the [`Clock`] so tests drive time with
//! `FakeClock::advance` instead of racing real timers, and every wait can
//! be interrupted by a cancellation token.

use remedarr_core::clock::Clock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep `duration` on the clock.
pub async fn sleep<C: Clock>(clock: &C, duration: Duration) {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let _handle = clock.after(
        duration,
        Box::new(move || {
            let _ = tx.send(());
        }),
    );
    let _ = rx.await;
}

/// Sleep `duration`, returning `false` if `token` fires first.
pub async fn sleep_unless_cancelled<C: Clock>(
    clock: &C,
    duration: Duration,
    token: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = sleep(clock, duration) => true,
    }
}

/// `min(initial * 2^attempt, cap)`, guarded against shift overflow.
pub fn backoff(initial: Duration, attempt: u32, cap: Duration) -> Duration {
    if attempt >= 32 {
        return cap;
    }
    let factor = 1u32 << attempt;
    initial.checked_mul(factor).unwrap_or(cap).min(cap)
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
