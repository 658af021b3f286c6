// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_adapters::{FakeArrClient, FakeDetector};
use remedarr_core::clock::FakeClock;
use remedarr_core::health::{HealthCheckError, HealthErrorKind};
use remedarr_core::scan_path::ScanPath;
use remedarr_storage::Store;

struct TestCtx {
    bus: Arc<EventBus<FakeClock>>,
    store: Store,
    arr: FakeArrClient,
    detector: FakeDetector,
    verifier: Arc<Verifier<FakeClock, FakeDetector>>,
    clock: FakeClock,
    dir: tempfile::TempDir,
    path_id: i64,
}

fn setup() -> TestCtx {
    let mut config = VerifierConfig::default();
    config.timeout = Duration::from_secs(600);
    setup_with(config)
}

fn setup_with(config: VerifierConfig) -> TestCtx {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_in_memory().unwrap();
    let clock = FakeClock::new();
    let path_id = store
        .insert_scan_path(
            &ScanPath::builder()
                .local_path(dir.path().display().to_string())
                .arr_path("/data")
                .build(),
        )
        .unwrap();
    let paths = store.enabled_scan_paths().unwrap();
    let mapper = Arc::new(PathMapper::new(&paths));
    let arr = FakeArrClient::new();
    let detector = FakeDetector::new();
    let bus = Arc::new(EventBus::new(store.clone(), clock.clone()));
    let verifier = Verifier::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::new(arr.clone()),
        mapper,
        Arc::new(detector.clone()),
        clock.clone(),
        config,
    );
    verifier.subscribe(&bus);
    TestCtx { bus, store, arr, detector, verifier, clock, dir, path_id }
}

impl TestCtx {
    fn local(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn create_local(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"replacement payload").unwrap();
        path.display().to_string()
    }

    async fn seed_and_search(&self, aggregate_id: &str, media_id: i64) {
        self.bus
            .publish(
                AggregateType::Corruption,
                aggregate_id,
                Event::CorruptionDetected {
                    file_path: self.local("old.mkv"),
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
        self.bus
            .publish(
                AggregateType::Corruption,
                aggregate_id,
                Event::SearchCompleted {
                    media_id,
                    arr_path: "/data/old.mkv".into(),
                    title: None,
                    year: None,
                    media_type: None,
                    instance: None,
                    season: None,
                    episode: None,
                    episode_title: None,
                    episode_ids: vec![],
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
        for _ in 0..2000 {
            if self.kinds(aggregate_id).contains(&kind) {
                return;
            }
            self.clock.advance(Duration::from_secs(10));
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        panic!("{kind} never appeared; trace: {:?}", self.kinds(aggregate_id));
    }
}

fn queue_item(state: TrackedDownloadState, status: &str, progress: f64) -> QueueItemInfo {
    QueueItemInfo {
        id: 1,
        title: "Replacement.Release".into(),
        status: status.into(),
        tracked_download_state: state,
        progress,
        download_id: Some("dl-1".into()),
        ..QueueItemInfo::default()
    }
}

fn import_history() -> HistoryItemInfo {
    HistoryItemInfo {
        event_type: "downloadFolderImported".into(),
        source_title: "Replacement.Release".into(),
        quality: Some("WEBDL-1080p".into()),
        release_group: Some("GROUP".into()),
        indexer: Some("indexer-1".into()),
        download_client: Some("sab".into()),
        ..HistoryItemInfo::default()
    }
}

#[tokio::test]
async fn import_through_queue_verifies_replacement() {
    let ctx = setup();
    let new_file = ctx.create_local("new.mkv");
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        42.0,
    )]);
    ctx.arr
        .push_queue_response(vec![queue_item(TrackedDownloadState::Importing, "importing", 100.0)]);
    ctx.arr.set_history(vec![import_history()]);
    ctx.arr.set_file_paths(vec!["/data/new.mkv".into()]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::VerificationSuccess).await;

    let kinds = ctx.kinds("agg-1");
    assert!(kinds.contains(&EventKind::DownloadProgress));
    assert!(kinds.contains(&EventKind::FileDetected));
    assert!(kinds.contains(&EventKind::VerificationStarted));

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let success = records
        .iter()
        .find_map(|r| match &r.event {
            Event::VerificationSuccess {
                verified_count,
                quality,
                release_group,
                new_file_path,
                total_duration_seconds,
                ..
            } => Some((
                *verified_count,
                quality.clone(),
                release_group.clone(),
                new_file_path.clone(),
                *total_duration_seconds,
            )),
            _ => None,
        })
        .unwrap();
    assert_eq!(success.0, 1);
    assert_eq!(success.1.as_deref(), Some("WEBDL-1080p"));
    assert_eq!(success.2.as_deref(), Some("GROUP"));
    assert_eq!(success.3.as_deref(), Some(new_file.as_str()));
    assert!(success.4.is_some());

    // The replacement was checked thoroughly.
    let checks = ctx.detector.checks();
    assert!(checks
        .iter()
        .any(|(p, m)| p.display().to_string() == new_file && *m == DetectionMode::Thorough));
}

#[tokio::test]
async fn failed_download_state_is_terminal() {
    let ctx = setup();
    let mut item = queue_item(TrackedDownloadState::Failed, "failed", 10.0);
    item.error_message = Some("disk full on client".into());
    ctx.arr.push_queue_response(vec![item]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::DownloadFailed).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let error = records
        .iter()
        .find_map(|r| match &r.event {
            Event::DownloadFailed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(error, "disk full on client");
}

#[tokio::test]
async fn ignored_download_state_is_terminal() {
    let ctx = setup();
    ctx.arr
        .push_queue_response(vec![queue_item(TrackedDownloadState::Ignored, "ignored", 0.0)]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::DownloadIgnored).await;
}

#[tokio::test]
async fn import_blocked_is_edge_triggered() {
    let ctx = setup();
    let mut blocked = queue_item(TrackedDownloadState::ImportBlocked, "completed", 100.0);
    blocked.status_messages = vec!["Sample file detected".into()];
    ctx.arr.push_queue_response(vec![blocked]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::ImportBlocked).await;

    // Let several more polls happen; the blocked state must not re-emit.
    for _ in 0..10 {
        ctx.clock.advance(Duration::from_secs(30));
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    let blocked_count = ctx
        .kinds("agg-1")
        .iter()
        .filter(|k| **k == EventKind::ImportBlocked)
        .count();
    assert_eq!(blocked_count, 1);

    ctx.verifier.shutdown().await;
}

#[tokio::test]
async fn vanished_queue_item_without_import_is_manual_removal() {
    let ctx = setup();
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        30.0,
    )]);
    ctx.arr.push_queue_response(vec![]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::ManuallyRemoved).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let (requires_manual, last_status) = records
        .iter()
        .find_map(|r| match &r.event {
            Event::ManuallyRemoved { requires_manual, last_status } => {
                Some((*requires_manual, last_status.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert!(requires_manual);
    assert_eq!(last_status, "downloading");
}

#[tokio::test]
async fn empty_queue_forever_times_out() {
    let ctx = setup();
    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::DownloadTimeout).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let (elapsed, timeout) = records
        .iter()
        .find_map(|r| match &r.event {
            Event::DownloadTimeout { elapsed_seconds, timeout_seconds } => {
                Some((*elapsed_seconds, *timeout_seconds))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(timeout, 600);
    assert!(elapsed >= 600);
}

#[tokio::test]
async fn media_id_zero_falls_back_to_file_polling() {
    let ctx = setup();
    // The replacement shows up at the original path before the search event
    // is even processed.
    ctx.create_local("old.mkv");

    ctx.seed_and_search("agg-1", 0).await;
    ctx.wait_for_kind("agg-1", EventKind::VerificationSuccess).await;

    let kinds = ctx.kinds("agg-1");
    assert!(kinds.contains(&EventKind::FileDetected));
    assert_eq!(ctx.arr.queue_calls(), 0, "fallback must not poll the queue");
}

#[tokio::test]
async fn corrupt_replacement_fails_verification() {
    let ctx = setup();
    let new_file = ctx.create_local("new.mkv");
    ctx.detector.set_verdict(
        &new_file,
        Err(HealthCheckError::new(HealthErrorKind::CorruptStream, "still broken")),
    );
    ctx.arr
        .push_queue_response(vec![queue_item(TrackedDownloadState::Importing, "importing", 100.0)]);
    ctx.arr.set_history(vec![import_history()]);
    ctx.arr.set_file_paths(vec!["/data/new.mkv".into()]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::VerificationFailed).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let (failed_count, total_count, failed_paths) = records
        .iter()
        .find_map(|r| match &r.event {
            Event::VerificationFailed { failed_count, total_count, failed_paths, .. } => {
                Some((*failed_count, *total_count, failed_paths.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(failed_count, 1);
    assert_eq!(total_count, 1);
    assert_eq!(failed_paths, vec![new_file]);
}

#[tokio::test]
async fn partial_replacement_past_half_timeout() {
    let ctx = setup();
    let present = ctx.create_local("e1.mkv");
    // Second expected file never arrives.
    ctx.arr.set_file_paths(vec!["/data/e1.mkv".into(), "/data/e2.mkv".into()]);
    ctx.arr.set_history(vec![import_history()]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::VerificationSuccess).await;

    let records = ctx.store.events_for_aggregate("agg-1").unwrap();
    let partial = records
        .iter()
        .find_map(|r| match &r.event {
            Event::FileDetected { file_paths, partial_replacement } => {
                Some((file_paths.clone(), *partial_replacement))
            }
            _ => None,
        })
        .unwrap();
    assert!(partial.1, "partial replacement flag expected");
    assert_eq!(partial.0, vec![present]);
}

#[tokio::test]
async fn history_fetch_is_retried_with_backoff() {
    let ctx = setup();
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        30.0,
    )]);
    ctx.arr.push_queue_response(vec![]);
    // Two failures, then history succeeds (empty, no import) →
    // ManuallyRemoved since the item was seen in the queue.
    ctx.arr.fail_history_times(2);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::ManuallyRemoved).await;
    assert!(ctx.arr.history_calls() >= 3);
}

#[tokio::test]
async fn double_shutdown_is_safe() {
    let ctx = setup();
    ctx.seed_and_search("agg-1", 55).await;
    ctx.verifier.shutdown().await;
    ctx.verifier.shutdown().await;
}

#[tokio::test]
async fn progress_is_emitted_only_on_change() {
    let ctx = setup();
    // Same status and progress across polls, then a change.
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        40.0,
    )]);
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        40.4,
    )]);
    ctx.arr.push_queue_response(vec![queue_item(
        TrackedDownloadState::Downloading,
        "downloading",
        75.0,
    )]);
    let mut failed = queue_item(TrackedDownloadState::Failed, "failed", 75.0);
    failed.error_message = Some("gave up".into());
    ctx.arr.push_queue_response(vec![failed]);

    ctx.seed_and_search("agg-1", 55).await;
    ctx.wait_for_kind("agg-1", EventKind::DownloadFailed).await;

    let progress_events: Vec<f64> = ctx
        .store
        .events_for_aggregate("agg-1")
        .unwrap()
        .iter()
        .filter_map(|r| match &r.event {
            Event::DownloadProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    // 40.0 and 40.4 share the same whole percent: one event, then 75.
    assert_eq!(progress_events, vec![40.0, 75.0]);
}
