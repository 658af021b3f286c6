// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use remedarr_core::health::HealthErrorKind;

#[tokio::test]
async fn missing_file_is_path_not_found() {
    let detector = CommandDetector::default();
    let err = detector
        .check(Path::new("/definitely/not/here.mkv"), DetectionMode::Quick)
        .await
        .unwrap_err();
    assert_eq!(err.kind, HealthErrorKind::PathNotFound);
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn empty_file_is_zero_byte() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.mkv");
    std::fs::write(&path, b"").unwrap();

    let detector = CommandDetector::default();
    let err = detector.check(&path, DetectionMode::Quick).await.unwrap_err();
    assert_eq!(err.kind, HealthErrorKind::ZeroByte);
    assert!(!err.is_recoverable());
}

#[test]
fn probe_stderr_classification() {
    assert_eq!(
        classify_probe_failure("moov atom not found\n").kind,
        HealthErrorKind::CorruptHeader
    );
    assert_eq!(
        classify_probe_failure("EBML header parsing failed").kind,
        HealthErrorKind::CorruptHeader
    );
    assert_eq!(
        classify_probe_failure("Invalid data found when processing input").kind,
        HealthErrorKind::InvalidFormat
    );
    assert_eq!(
        classify_probe_failure("/media/tv: Stale file handle").kind,
        HealthErrorKind::MountLost
    );
    assert_eq!(
        classify_probe_failure("Permission denied").kind,
        HealthErrorKind::AccessDenied
    );
    assert_eq!(
        classify_probe_failure("error while decoding stream #0:0").kind,
        HealthErrorKind::CorruptStream
    );
}

#[test]
fn classification_keeps_first_stderr_line() {
    let err = classify_probe_failure("first line\nsecond line");
    assert_eq!(err.message, "first line");
}
