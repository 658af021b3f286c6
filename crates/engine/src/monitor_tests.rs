// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_core::clock::FakeClock;
use remedarr_core::health::HealthErrorKind;
use remedarr_core::scan_path::ScanPath;
use std::time::Duration;

struct TestCtx {
    bus: Arc<EventBus<FakeClock>>,
    store: Store,
    clock: FakeClock,
    monitor: Arc<RetryMonitor<FakeClock>>,
    path_id: i64,
}

fn setup(max_retries: u32) -> TestCtx {
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::new();
    let path_id = store
        .insert_scan_path(
            &ScanPath::builder()
                .local_path("/media/movies")
                .arr_path("/data/movies")
                .max_retries(max_retries)
                .build(),
        )
        .unwrap();
    let bus = Arc::new(EventBus::new(store.clone(), clock.clone()));
    let monitor =
        RetryMonitor::new(Arc::clone(&bus), store.clone(), clock.clone(), MonitorConfig::default());
    monitor.subscribe(&bus);
    TestCtx { bus, store, clock, monitor, path_id }
}

impl TestCtx {
    async fn seed_aggregate(&self, aggregate_id: &str) {
        self.bus
            .publish(
                AggregateType::Corruption,
                aggregate_id,
                Event::CorruptionDetected {
                    file_path: "/media/movies/corrupt.mkv".into(),
                    path_id: self.path_id,
                    corruption_type: HealthErrorKind::CorruptHeader,
                    error_details: "broken".into(),
                    auto_remediate: true,
                    dry_run: false,
                    batch_throttled: false,
                },
            )
            .await
            .unwrap();
    }

    async fn publish_failure(&self, aggregate_id: &str) {
        self.bus
            .publish(
                AggregateType::Corruption,
                aggregate_id,
                Event::DeletionFailed {
                    file_path: "/media/movies/corrupt.mkv".into(),
                    error: "arr 500".into(),
                },
            )
            .await
            .unwrap();
    }

    fn kinds(&self, aggregate_id: &str) -> Vec<EventKind> {
        self.store
            .events_for_aggregate(aggregate_id)
            .unwrap()
            .iter()
            .map(|r| r.kind())
            .collect()
    }

    async fn wait_for_kind(&self, aggregate_id: &str, kind: EventKind) {
        for _ in 0..500 {
            if self.kinds(aggregate_id).contains(&kind) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("{kind} never appeared; trace: {:?}", self.kinds(aggregate_id));
    }
}

#[tokio::test]
async fn first_failure_schedules_retry_at_base_delay() {
    let ctx = setup(3);
    ctx.seed_aggregate("agg-1").await;
    ctx.publish_failure("agg-1").await;

    assert_eq!(ctx.monitor.pending_retries(), 1);

    // 15 min * 2^0: not yet at 14 minutes, due at 15.
    ctx.clock.advance(Duration::from_secs(14 * 60));
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(!ctx.kinds("agg-1").contains(&EventKind::RetryScheduled));

    ctx.clock.advance(Duration::from_secs(60));
    ctx.wait_for_kind("agg-1", EventKind::RetryScheduled).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let retry = records
        .iter()
        .find_map(|r| match &r.event {
            Event::RetryScheduled { file_path, path_id, original_state } => {
                Some((file_path.clone(), *path_id, original_state.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(retry.0, "/media/movies/corrupt.mkv");
    assert_eq!(retry.1, ctx.path_id);
    assert_eq!(retry.2, "deletion_failed");
}

#[tokio::test]
async fn third_failure_backs_off_to_sixty_minutes() {
    let ctx = setup(3);
    ctx.seed_aggregate("agg-1").await;
    // Two prior failures already on the log.
    ctx.publish_failure("agg-1").await;
    ctx.publish_failure("agg-1").await;
    ctx.clock.fire_all();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    // The third failure: delay = 15 min * 2^2 = 60 min.
    ctx.publish_failure("agg-1").await;
    assert_eq!(ctx.monitor.pending_retries(), 1);

    ctx.clock.advance(Duration::from_secs(59 * 60));
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let retries_before = ctx
        .kinds("agg-1")
        .iter()
        .filter(|k| **k == EventKind::RetryScheduled)
        .count();

    ctx.clock.advance(Duration::from_secs(60));
    for _ in 0..500 {
        let count = ctx
            .kinds("agg-1")
            .iter()
            .filter(|k| **k == EventKind::RetryScheduled)
            .count();
        if count > retries_before {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    assert!(!ctx.kinds("agg-1").contains(&EventKind::MaxRetriesReached));
}

#[tokio::test]
async fn failure_past_limit_yields_max_retries_reached() {
    let ctx = setup(3);
    ctx.seed_aggregate("agg-1").await;
    for _ in 0..3 {
        ctx.publish_failure("agg-1").await;
    }
    assert_eq!(ctx.monitor.pending_retries(), 1);

    // Fourth failure: three prior failures, limit 3 → terminal.
    ctx.publish_failure("agg-1").await;
    ctx.wait_for_kind("agg-1", EventKind::MaxRetriesReached).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let (retry_count, max_retries) = records
        .iter()
        .find_map(|r| match &r.event {
            Event::MaxRetriesReached { retry_count, max_retries, .. } => {
                Some((*retry_count, *max_retries))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(retry_count, 3);
    assert_eq!(max_retries, 3);

    // The terminal aggregate holds no armed timer.
    assert_eq!(ctx.monitor.pending_retries(), 0);
}

#[tokio::test]
async fn retry_count_equals_prior_failures_at_terminal() {
    let ctx = setup(2);
    ctx.seed_aggregate("agg-1").await;
    for _ in 0..3 {
        ctx.publish_failure("agg-1").await;
    }
    ctx.wait_for_kind("agg-1", EventKind::MaxRetriesReached).await;

    let failures = ctx.store.count_failure_events("agg-1").unwrap();
    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let retry_count = records
        .iter()
        .find_map(|r| match &r.event {
            Event::MaxRetriesReached { retry_count, .. } => Some(*retry_count),
            _ => None,
        })
        .unwrap();
    // The terminal event's count equals the prior failures (the third
    // failure triggered it).
    assert_eq!(retry_count, failures - 1);
}

#[tokio::test]
async fn failure_without_context_is_dropped() {
    let ctx = setup(3);
    // A failure on an aggregate with no CorruptionDetected cannot happen
    // through the log (first-event invariant); simulate a handler-level
    // delivery instead.
    let record = EventRecord::transient(
        AggregateType::Corruption,
        "ghost",
        Event::DeletionFailed { file_path: "/m/x.mkv".into(), error: "x".into() },
        ctx.clock.utc_now(),
    );
    ctx.bus.republish(&record).await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    assert_eq!(ctx.monitor.pending_retries(), 0);
    assert!(ctx.store.events_for_aggregate("ghost").unwrap().is_empty());
}

#[tokio::test]
async fn needs_attention_events_never_schedule() {
    let ctx = setup(3);
    ctx.seed_aggregate("agg-1").await;
    ctx.bus
        .publish(
            AggregateType::Corruption,
            "agg-1",
            Event::ImportBlocked { download_id: None, title: None, messages: vec![] },
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(ctx.monitor.pending_retries(), 0);
}

#[tokio::test]
async fn stop_cancels_timers_and_is_idempotent() {
    let ctx = setup(3);
    ctx.seed_aggregate("agg-1").await;
    ctx.publish_failure("agg-1").await;
    assert_eq!(ctx.monitor.pending_retries(), 1);

    ctx.monitor.stop();
    assert_eq!(ctx.monitor.pending_retries(), 0);
    ctx.monitor.stop();

    // The cancelled timer never fires.
    ctx.clock.advance(Duration::from_secs(24 * 3600));
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(!ctx.kinds("agg-1").contains(&EventKind::RetryScheduled));

    // Stopped monitor ignores further failures.
    ctx.publish_failure("agg-1").await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(ctx.monitor.pending_retries(), 0);
}

#[tokio::test]
async fn scan_path_override_controls_the_limit() {
    let ctx = setup(1);
    ctx.seed_aggregate("agg-1").await;
    ctx.publish_failure("agg-1").await; // prior=0 < 1 → schedule
    ctx.publish_failure("agg-1").await; // prior=1 >= 1 → terminal
    ctx.wait_for_kind("agg-1", EventKind::MaxRetriesReached).await;
}
