// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
}

fn mount_lost() -> HealthCheckError {
    HealthCheckError::new(HealthErrorKind::MountLost, "stale file handle")
}

#[test]
fn upsert_inserts_then_refreshes() {
    let store = store();
    store.upsert_pending_rescan("/m/a.mkv", 1, &mount_lost(), t0(), 5).unwrap();

    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();
    assert_eq!(row.error_type, HealthErrorKind::MountLost);
    assert_eq!(row.status, RescanStatus::Pending);
    assert_eq!(row.retry_count, 0);

    // Second sighting with a different error refreshes in place.
    let io = HealthCheckError::new(HealthErrorKind::IoError, "read error");
    let later = t0() + chrono::Duration::minutes(10);
    store.upsert_pending_rescan("/m/a.mkv", 1, &io, later, 5).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();
    assert_eq!(row.error_type, HealthErrorKind::IoError);
    assert_eq!(row.next_retry_at, later);
}

#[test]
fn due_selection_respects_deadline_order_and_limit() {
    let store = store();
    for (i, offset) in [3i64, 1, 2].iter().enumerate() {
        store
            .upsert_pending_rescan(
                &format!("/m/{i}.mkv"),
                1,
                &mount_lost(),
                t0() + chrono::Duration::minutes(*offset),
                5,
            )
            .unwrap();
    }

    let due = store.due_rescans(t0() + chrono::Duration::minutes(5), 2).unwrap();
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].file_path, "/m/1.mkv");
    assert_eq!(due[1].file_path, "/m/2.mkv");

    let none_due = store.due_rescans(t0(), 50).unwrap();
    assert!(none_due.is_empty());
}

#[test]
fn exhausted_rows_are_not_selected() {
    let store = store();
    store.upsert_pending_rescan("/m/a.mkv", 1, &mount_lost(), t0(), 2).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();
    store.bump_rescan_retry(row.id, 2, t0(), false).unwrap();

    // retry_count == max_retries excludes the row.
    let due = store.due_rescans(t0() + chrono::Duration::hours(1), 50).unwrap();
    assert!(due.is_empty());
}

#[test]
fn resolution_marks_status() {
    let store = store();
    store.upsert_pending_rescan("/m/a.mkv", 1, &mount_lost(), t0(), 5).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();

    store.mark_rescan_resolved(row.id, RescanResolution::Healthy).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();
    assert_eq!(row.status, RescanStatus::Resolved);
    assert_eq!(row.resolution, Some(RescanResolution::Healthy));
}

#[test]
fn abandonment_via_bump() {
    let store = store();
    store.upsert_pending_rescan("/m/a.mkv", 1, &mount_lost(), t0(), 3).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();

    store.bump_rescan_retry(row.id, 3, t0(), true).unwrap();
    let row = store.pending_rescan_for_path("/m/a.mkv").unwrap().unwrap();
    assert_eq!(row.status, RescanStatus::Abandoned);
    assert_eq!(row.resolution, Some(RescanResolution::Abandoned));
}
