// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_adapters::FakeDetector;
use remedarr_core::clock::FakeClock;
use remedarr_core::health::{HealthCheckError, HealthErrorKind};
use remedarr_core::rescan::RescanStatus;
use remedarr_core::scan_path::ScanPath;

struct TestCtx {
    store: Store,
    clock: FakeClock,
    detector: FakeDetector,
    worker: Arc<RescanWorker<FakeClock, FakeDetector>>,
    path_id: i64,
}

fn setup() -> TestCtx {
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::new();
    let path_id = store
        .insert_scan_path(
            &ScanPath::builder().local_path("/media/tv").arr_path("/data/tv").build(),
        )
        .unwrap();
    let detector = FakeDetector::new();
    let bus = Arc::new(EventBus::new(store.clone(), clock.clone()));
    let worker = RescanWorker::new(
        bus,
        store.clone(),
        Arc::new(detector.clone()),
        clock.clone(),
        RescanConfig::default(),
    );
    TestCtx { store, clock, detector, worker, path_id }
}

impl TestCtx {
    fn queue(&self, file: &str, kind: HealthErrorKind, max_retries: u32) {
        self.store
            .upsert_pending_rescan(
                file,
                self.path_id,
                &HealthCheckError::new(kind, "infra error"),
                self.clock.utc_now(),
                max_retries,
            )
            .unwrap();
    }

    fn row(&self, file: &str) -> remedarr_core::rescan::PendingRescan {
        self.store.pending_rescan_for_path(file).unwrap().unwrap()
    }
}

#[tokio::test]
async fn healthy_file_resolves() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::MountLost, 5);

    let handled = ctx.worker.process_due().await.unwrap();
    assert_eq!(handled, 1);

    let row = ctx.row("/media/tv/a.mkv");
    assert_eq!(row.status, RescanStatus::Resolved);
    assert_eq!(row.resolution, Some(RescanResolution::Healthy));
}

#[tokio::test]
async fn still_broken_backs_off() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::MountLost, 5);
    ctx.detector.set_verdict(
        "/media/tv/a.mkv",
        Err(HealthCheckError::new(HealthErrorKind::MountLost, "still stale")),
    );

    ctx.worker.process_due().await.unwrap();

    let row = ctx.row("/media/tv/a.mkv");
    assert_eq!(row.status, RescanStatus::Pending);
    assert_eq!(row.retry_count, 1);
    // 5 * 2^1 minutes out.
    assert_eq!(row.next_retry_at - ctx.clock.utc_now(), chrono::Duration::minutes(10));

    // Not due again until the deadline passes.
    assert_eq!(ctx.worker.process_due().await.unwrap(), 0);
    ctx.clock.advance(std::time::Duration::from_secs(10 * 60));
    assert_eq!(ctx.worker.process_due().await.unwrap(), 1);
}

#[tokio::test]
async fn exhausted_rescan_is_abandoned() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::IoError, 1);
    ctx.detector.set_verdict(
        "/media/tv/a.mkv",
        Err(HealthCheckError::new(HealthErrorKind::IoError, "read error")),
    );

    ctx.worker.process_due().await.unwrap();

    let row = ctx.row("/media/tv/a.mkv");
    assert_eq!(row.status, RescanStatus::Abandoned);
    assert_eq!(row.resolution, Some(RescanResolution::Abandoned));
}

#[tokio::test]
async fn corrupt_file_enters_remediation_pipeline() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::MountLost, 5);
    ctx.detector.set_verdict(
        "/media/tv/a.mkv",
        Err(HealthCheckError::new(HealthErrorKind::CorruptHeader, "actually corrupt")),
    );

    ctx.worker.process_due().await.unwrap();

    let row = ctx.row("/media/tv/a.mkv");
    assert_eq!(row.status, RescanStatus::Resolved);
    assert_eq!(row.resolution, Some(RescanResolution::Corrupt));

    let detections = ctx.store.unhandled_detections().unwrap();
    assert_eq!(detections.len(), 1);
    match &detections[0].event {
        Event::CorruptionDetected { file_path, corruption_type, auto_remediate, .. } => {
            assert_eq!(file_path, "/media/tv/a.mkv");
            assert_eq!(*corruption_type, HealthErrorKind::CorruptHeader);
            // Policy comes from the owning scan path.
            assert!(*auto_remediate);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn corrupt_rescan_respects_dedup() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::MountLost, 5);
    ctx.detector.set_verdict(
        "/media/tv/a.mkv",
        Err(HealthCheckError::new(HealthErrorKind::CorruptHeader, "corrupt")),
    );

    // An open aggregate already tracks the file.
    let bus = EventBus::new(ctx.store.clone(), ctx.clock.clone());
    bus.publish(
        AggregateType::Corruption,
        "agg-existing",
        Event::CorruptionDetected {
            file_path: "/media/tv/a.mkv".into(),
            path_id: ctx.path_id,
            corruption_type: HealthErrorKind::CorruptHeader,
            error_details: "earlier".into(),
            auto_remediate: true,
            dry_run: false,
            batch_throttled: false,
        },
    )
    .await
    .unwrap();

    ctx.worker.process_due().await.unwrap();
    let detections = ctx.store.unhandled_detections().unwrap();
    assert_eq!(detections.len(), 1, "no duplicate aggregate");
}

#[tokio::test]
async fn batch_is_limited() {
    let ctx = setup();
    for i in 0..60 {
        ctx.queue(&format!("/media/tv/{i}.mkv"), HealthErrorKind::MountLost, 5);
    }
    let handled = ctx.worker.process_due().await.unwrap();
    assert_eq!(handled, RescanConfig::default().batch);
}

#[tokio::test]
async fn ticker_runs_until_stopped() {
    let ctx = setup();
    ctx.queue("/media/tv/a.mkv", HealthErrorKind::MountLost, 5);

    let handle = ctx.worker.start();
    // First tick fires after the interval.
    ctx.clock.advance(RescanConfig::default().tick);
    for _ in 0..200 {
        if ctx.row("/media/tv/a.mkv").status == RescanStatus::Resolved {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    assert_eq!(ctx.row("/media/tv/a.mkv").status, RescanStatus::Resolved);

    ctx.worker.stop();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
}
