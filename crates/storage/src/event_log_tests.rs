// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use remedarr_core::health::HealthErrorKind;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
}

fn detected(path: &str) -> Event {
    Event::CorruptionDetected {
        file_path: path.into(),
        path_id: 1,
        corruption_type: HealthErrorKind::CorruptHeader,
        error_details: "bad header".into(),
        auto_remediate: true,
        dry_run: false,
        batch_throttled: false,
    }
}

fn deletion_failed(path: &str) -> Event {
    Event::DeletionFailed { file_path: path.into(), error: "arr down".into() }
}

#[test]
fn append_assigns_sequential_versions() {
    let store = store();
    let a = store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    let b = store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::RemediationQueued {
                file_path: "/m/a.mkv".into(),
                dry_run: false,
                media_id: None,
                note: None,
            },
            None,
            t0(),
        )
        .unwrap();
    assert_eq!(a.event_version, 1);
    assert_eq!(b.event_version, 2);
    assert!(b.created_at > a.created_at, "created_at must strictly increase");
}

#[test]
fn versions_are_independent_per_aggregate() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    let other = store
        .append_event(AggregateType::Corruption, "agg-2", &detected("/m/b.mkv"), None, t0())
        .unwrap();
    assert_eq!(other.event_version, 1);
}

#[test]
fn corruption_aggregate_must_start_with_detection() {
    let store = store();
    let err = store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::SearchStarted { media_id: 1 },
            None,
            t0(),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::FirstEventNotDetection(_)));
}

#[test]
fn system_aggregate_has_no_first_event_restriction() {
    let store = store();
    store
        .append_event(
            AggregateType::System,
            "system",
            &Event::SystemHealthDegraded {
                reason: "preflight".into(),
                path: Some("/m".into()),
                details: None,
                corruption_count: None,
            },
            None,
            t0(),
        )
        .unwrap();
}

#[test]
fn events_round_trip_through_storage() {
    let store = store();
    let event = detected("/m/a.mkv");
    store.append_event(AggregateType::Corruption, "agg-1", &event, Some("webhook"), t0()).unwrap();

    let records = store.events_for_aggregate("agg-1").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, event);
    assert_eq!(records[0].user_id.as_deref(), Some("webhook"));
    assert_eq!(records[0].aggregate_type, AggregateType::Corruption);
}

#[test]
fn last_and_first_event_queries() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    store
        .append_event(AggregateType::Corruption, "agg-1", &deletion_failed("/m/a.mkv"), None, t0())
        .unwrap();

    let last = store.last_event_for_aggregate("agg-1").unwrap().unwrap();
    assert_eq!(last.kind(), EventKind::DeletionFailed);
    let first_at = store.first_event_at("agg-1").unwrap().unwrap();
    assert_eq!(first_at, t0());
    assert!(store.last_event_for_aggregate("missing").unwrap().is_none());
}

#[test]
fn dedup_finds_open_detection_within_window() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();

    let found = store
        .recent_open_detection("/m/a.mkv", Duration::from_secs(7 * 24 * 3600), t0())
        .unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().aggregate_id, "agg-1");

    // Different path does not match.
    let other = store
        .recent_open_detection("/m/b.mkv", Duration::from_secs(7 * 24 * 3600), t0())
        .unwrap();
    assert!(other.is_none());
}

#[test]
fn dedup_ignores_closed_aggregates() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::VerificationSuccess {
                verified_count: 1,
                total_duration_seconds: None,
                download_duration_seconds: None,
                quality: None,
                release_group: None,
                indexer: None,
                download_client: None,
                new_file_path: None,
                new_file_size: None,
            },
            None,
            t0(),
        )
        .unwrap();

    let found = store
        .recent_open_detection("/m/a.mkv", Duration::from_secs(7 * 24 * 3600), t0())
        .unwrap();
    assert!(found.is_none(), "verified aggregate must not block re-detection");
}

#[test]
fn dedup_ignores_detections_outside_window() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();

    let eight_days_later = t0() + chrono::Duration::days(8);
    let found = store
        .recent_open_detection("/m/a.mkv", Duration::from_secs(7 * 24 * 3600), eight_days_later)
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn failure_count_counts_only_failure_kinds() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    store
        .append_event(AggregateType::Corruption, "agg-1", &deletion_failed("/m/a.mkv"), None, t0())
        .unwrap();
    store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::RetryScheduled {
                file_path: "/m/a.mkv".into(),
                path_id: 1,
                original_state: "deletion_failed".into(),
            },
            None,
            t0(),
        )
        .unwrap();
    store
        .append_event(AggregateType::Corruption, "agg-1", &deletion_failed("/m/a.mkv"), None, t0())
        .unwrap();

    assert_eq!(store.count_failure_events("agg-1").unwrap(), 2);
    assert_eq!(store.count_failure_events("missing").unwrap(), 0);
}

#[test]
fn prior_deletion_completed_lookup() {
    let store = store();
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    assert!(store.prior_deletion_completed("agg-1").unwrap().is_none());

    store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::DeletionCompleted {
                file_path: "/m/a.mkv".into(),
                arr_path: "/d/a.mkv".into(),
                media_id: 55,
                episode_ids: vec![7, 8],
            },
            None,
            t0(),
        )
        .unwrap();

    let prior = store.prior_deletion_completed("agg-1").unwrap().unwrap();
    match prior.event {
        Event::DeletionCompleted { media_id, episode_ids, .. } => {
            assert_eq!(media_id, 55);
            assert_eq!(episode_ids, vec![7, 8]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn unhandled_detections_are_first_and_only_events() {
    let store = store();
    // agg-1: handled (has a follow-up event)
    store
        .append_event(AggregateType::Corruption, "agg-1", &detected("/m/a.mkv"), None, t0())
        .unwrap();
    store
        .append_event(
            AggregateType::Corruption,
            "agg-1",
            &Event::RemediationQueued {
                file_path: "/m/a.mkv".into(),
                dry_run: false,
                media_id: None,
                note: None,
            },
            None,
            t0(),
        )
        .unwrap();
    // agg-2: unhandled
    store
        .append_event(AggregateType::Corruption, "agg-2", &detected("/m/b.mkv"), None, t0())
        .unwrap();

    let unhandled = store.unhandled_detections().unwrap();
    assert_eq!(unhandled.len(), 1);
    assert_eq!(unhandled[0].aggregate_id, "agg-2");
}
