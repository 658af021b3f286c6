// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_core::health::{DetectionMode, HealthErrorKind};
use remedarr_core::scan::ScanFileStatus;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn new_scan(path: &str, files: &[&str]) -> NewScan {
    NewScan {
        path: path.into(),
        path_id: 1,
        file_list: files.iter().map(|s| s.to_string()).collect(),
        detection: DetectionConfig {
            method: "ffprobe".into(),
            mode: DetectionMode::Quick,
            args: vec![],
        },
        auto_remediate: true,
        dry_run: false,
        started_at: Utc::now(),
    }
}

#[test]
fn create_and_read_back_snapshot() {
    let store = store();
    let id = store.create_scan(&new_scan("/m/tv", &["/m/tv/a.mkv", "/m/tv/b.mkv"])).unwrap();

    let scan = store.scan(id).unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Running);
    assert_eq!(scan.total_files, 2);
    assert_eq!(scan.files_scanned, 0);
    assert_eq!(scan.file_list, vec!["/m/tv/a.mkv", "/m/tv/b.mkv"]);
    assert_eq!(scan.detection.method, "ffprobe");
    assert!(scan.completed_at.is_none());
}

#[test]
fn progress_checkpoint_round_trip() {
    let store = store();
    let id = store.create_scan(&new_scan("/m/tv", &["a", "b", "c"])).unwrap();
    store.update_scan_progress(id, 2, 2).unwrap();

    let scan = store.scan(id).unwrap().unwrap();
    assert_eq!(scan.current_file_index, 2);
    assert_eq!(scan.files_scanned, 2);
}

#[test]
fn progress_on_missing_scan_errors() {
    let store = store();
    assert!(matches!(
        store.update_scan_progress(999, 1, 1),
        Err(StoreError::ScanNotFound(999))
    ));
}

#[test]
fn interrupted_scans_listing() {
    let store = store();
    let a = store.create_scan(&new_scan("/m/a", &["x"])).unwrap();
    let b = store.create_scan(&new_scan("/m/b", &["y"])).unwrap();
    store.set_scan_status(a, ScanStatus::Interrupted, None).unwrap();
    store.set_scan_status(b, ScanStatus::Completed, Some(Utc::now())).unwrap();

    let interrupted = store.interrupted_scans().unwrap();
    assert_eq!(interrupted.len(), 1);
    assert_eq!(interrupted[0].id, a);
}

#[test]
fn scan_file_audit_rows() {
    let store = store();
    let id = store.create_scan(&new_scan("/m/tv", &["a", "b"])).unwrap();
    store
        .record_scan_file(&ScanFileRecord {
            scan_id: id,
            file_path: "/m/tv/a.mkv".into(),
            status: ScanFileStatus::Corrupt,
            corruption_type: Some(HealthErrorKind::ZeroByte),
            error_details: Some("empty".into()),
            file_size: Some(0),
        })
        .unwrap();
    store
        .record_scan_file(&ScanFileRecord {
            scan_id: id,
            file_path: "/m/tv/b.mkv".into(),
            status: ScanFileStatus::Healthy,
            corruption_type: None,
            error_details: None,
            file_size: Some(1024),
        })
        .unwrap();

    let rows = store.scan_files(id).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, ScanFileStatus::Corrupt);
    assert_eq!(rows[0].corruption_type, Some(HealthErrorKind::ZeroByte));
    assert_eq!(rows[1].status, ScanFileStatus::Healthy);
}
