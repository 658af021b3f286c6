// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_core::scan_path::ScanPath;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn seed_path(store: &Store) -> i64 {
    store.insert_scan_path(&ScanPath::builder().build()).unwrap()
}

#[test]
fn insert_update_delete() {
    let store = store();
    let path_id = seed_path(&store);
    let id = store.insert_schedule(path_id, "0 3 * * *", true).unwrap();

    let schedule = store.schedule(id).unwrap().unwrap();
    assert_eq!(schedule.cron_expression, "0 3 * * *");
    assert!(schedule.enabled);

    store.update_schedule(id, "30 4 * * 1", false).unwrap();
    let schedule = store.schedule(id).unwrap().unwrap();
    assert_eq!(schedule.cron_expression, "30 4 * * 1");
    assert!(!schedule.enabled);

    store.delete_schedule(id).unwrap();
    assert!(store.schedule(id).unwrap().is_none());
}

#[test]
fn enabled_schedules_skip_disabled_rows() {
    let store = store();
    let path_id = seed_path(&store);
    store.insert_schedule(path_id, "0 3 * * *", true).unwrap();
    store.insert_schedule(path_id, "0 4 * * *", false).unwrap();

    let enabled = store.enabled_schedules().unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].cron_expression, "0 3 * * *");
}

#[test]
fn orphan_cleanup_removes_dangling_schedules() {
    let store = store();
    let path_id = seed_path(&store);
    let kept = store.insert_schedule(path_id, "0 3 * * *", true).unwrap();
    let orphan = store.insert_schedule(path_id + 100, "0 4 * * *", true).unwrap();

    let removed = store.delete_orphaned_schedules().unwrap();
    assert_eq!(removed, vec![orphan]);
    assert!(store.schedule(kept).unwrap().is_some());
    assert!(store.schedule(orphan).unwrap().is_none());
}
