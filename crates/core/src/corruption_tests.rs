// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::AggregateType;
use chrono::TimeZone;

fn record(id: &str, version: i64, event: Event) -> EventRecord {
    EventRecord {
        id: version,
        aggregate_type: AggregateType::Corruption,
        aggregate_id: id.to_string(),
        event,
        event_version: version,
        created_at: Utc.timestamp_opt(1_700_000_000 + version * 60, 0).single().unwrap(),
        user_id: None,
    }
}

fn detected() -> Event {
    Event::CorruptionDetected {
        file_path: "/media/movies/corrupt.mkv".into(),
        path_id: 1,
        corruption_type: crate::health::HealthErrorKind::CorruptHeader,
        error_details: "header checksum mismatch".into(),
        auto_remediate: true,
        dry_run: false,
        batch_throttled: false,
    }
}

#[test]
fn terminal_states() {
    for state in [
        CorruptionState::VerificationSuccess,
        CorruptionState::SearchExhausted,
        CorruptionState::MaxRetriesReached,
        CorruptionState::ImportBlocked,
        CorruptionState::ManuallyRemoved,
    ] {
        assert!(state.is_terminal(), "{state} should be terminal");
        assert_eq!(state.stale_class(), None);
    }
    assert!(!CorruptionState::Detected.is_terminal());
    assert!(!CorruptionState::DownloadProgress.is_terminal());
}

#[test]
fn stale_classes() {
    use StateClass::*;
    assert_eq!(CorruptionState::DownloadProgress.stale_class(), Some(PostSearch));
    assert_eq!(CorruptionState::SearchCompleted.stale_class(), Some(PostSearch));
    assert_eq!(CorruptionState::SearchStarted.stale_class(), Some(PostSearch));
    assert_eq!(CorruptionState::FileDetected.stale_class(), Some(PostSearch));
    assert_eq!(CorruptionState::RemediationQueued.stale_class(), Some(EarlyRemediation));
    assert_eq!(CorruptionState::DeletionStarted.stale_class(), Some(EarlyRemediation));
    assert_eq!(CorruptionState::DeletionCompleted.stale_class(), Some(EarlyRemediation));
    assert_eq!(CorruptionState::DeletionFailed.stale_class(), Some(Failed));
    assert_eq!(CorruptionState::SearchFailed.stale_class(), Some(Failed));
    assert_eq!(CorruptionState::VerificationFailed.stale_class(), Some(Failed));
    assert_eq!(CorruptionState::DownloadTimeout.stale_class(), Some(Failed));
    assert_eq!(CorruptionState::DownloadFailed.stale_class(), Some(Failed));
    assert_eq!(CorruptionState::Detected.stale_class(), None);
    assert_eq!(CorruptionState::RetryScheduled.stale_class(), None);
}

#[test]
fn display_parse_round_trip() {
    for state in [
        CorruptionState::Detected,
        CorruptionState::DeletionCompleted,
        CorruptionState::DownloadProgress,
        CorruptionState::MaxRetriesReached,
    ] {
        assert_eq!(CorruptionState::parse(&state.to_string()), Some(state));
    }
    assert_eq!(CorruptionState::parse("nonsense"), None);
}

#[test]
fn projection_starts_only_from_detection() {
    let not_first = record("agg-1", 1, Event::SearchStarted { media_id: 9 });
    assert!(CorruptionStatus::from_first_event(&not_first).is_none());

    let first = record("agg-1", 1, detected());
    let status = CorruptionStatus::from_first_event(&first).unwrap();
    assert_eq!(status.current_state, CorruptionState::Detected);
    assert_eq!(status.file_path, "/media/movies/corrupt.mkv");
    assert_eq!(status.path_id, 1);
    assert_eq!(status.media_id, None);
    assert_eq!(status.retry_count, 0);
}

#[test]
fn replay_happy_path_trace() {
    let records = vec![
        record("agg-1", 1, detected()),
        record("agg-1", 2, Event::RemediationQueued {
            file_path: "/media/movies/corrupt.mkv".into(),
            dry_run: false,
            media_id: None,
            note: None,
        }),
        record("agg-1", 3, Event::DeletionStarted {
            file_path: "/media/movies/corrupt.mkv".into(),
            arr_path: "/data/movies/corrupt.mkv".into(),
            media_id: 123,
        }),
        record("agg-1", 4, Event::DeletionCompleted {
            file_path: "/media/movies/corrupt.mkv".into(),
            arr_path: "/data/movies/corrupt.mkv".into(),
            media_id: 123,
            episode_ids: vec![],
        }),
        record("agg-1", 5, Event::SearchStarted { media_id: 123 }),
        record("agg-1", 6, Event::VerificationSuccess {
            verified_count: 1,
            total_duration_seconds: Some(300),
            download_duration_seconds: None,
            quality: None,
            release_group: None,
            indexer: None,
            download_client: None,
            new_file_path: None,
            new_file_size: None,
        }),
    ];
    let status = CorruptionStatus::replay(records.iter()).unwrap();
    assert_eq!(status.current_state, CorruptionState::VerificationSuccess);
    assert!(status.current_state.is_terminal());
    assert_eq!(status.media_id, Some(123));
    assert_eq!(status.retry_count, 0);
    assert_eq!(status.last_updated_at, records[5].created_at);
}

#[test]
fn replay_counts_failures() {
    let records = vec![
        record("agg-2", 1, detected()),
        record("agg-2", 2, Event::DeletionFailed {
            file_path: "/media/movies/corrupt.mkv".into(),
            error: "arr 500".into(),
        }),
        record("agg-2", 3, Event::RetryScheduled {
            file_path: "/media/movies/corrupt.mkv".into(),
            path_id: 1,
            original_state: "deletion_failed".into(),
        }),
        record("agg-2", 4, Event::DeletionFailed {
            file_path: "/media/movies/corrupt.mkv".into(),
            error: "arr 500".into(),
        }),
    ];
    let status = CorruptionStatus::replay(records.iter()).unwrap();
    assert_eq!(status.retry_count, 2);
    assert_eq!(status.current_state, CorruptionState::DeletionFailed);
}

#[test]
fn zero_media_id_is_not_recorded() {
    let records = vec![
        record("agg-3", 1, detected()),
        record("agg-3", 2, Event::SearchStarted { media_id: 0 }),
    ];
    let status = CorruptionStatus::replay(records.iter()).unwrap();
    assert_eq!(status.media_id, None);
}

#[test]
fn non_state_events_do_not_move_state() {
    let mut status =
        CorruptionStatus::from_first_event(&record("agg-4", 1, detected())).unwrap();
    status.apply(&record("agg-4", 2, Event::SystemHealthDegraded {
        reason: "corruption_batch".into(),
        path: None,
        details: None,
        corruption_count: Some(10),
    }));
    assert_eq!(status.current_state, CorruptionState::Detected);
}
