// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    running = { ScanStatus::Running, "running", false },
    paused = { ScanStatus::Paused, "paused", false },
    interrupted = { ScanStatus::Interrupted, "interrupted", false },
    completed = { ScanStatus::Completed, "completed", true },
    cancelled = { ScanStatus::Cancelled, "cancelled", true },
    aborted = { ScanStatus::Aborted, "aborted", true },
)]
fn scan_status_round_trip(status: ScanStatus, s: &str, terminal: bool) {
    assert_eq!(status.to_string(), s);
    assert_eq!(ScanStatus::parse(s), Some(status));
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn unknown_status_does_not_parse() {
    assert_eq!(ScanStatus::parse("exploded"), None);
    assert_eq!(ScanFileStatus::parse("exploded"), None);
}

#[parameterized(
    healthy = { ScanFileStatus::Healthy, "healthy" },
    corrupt = { ScanFileStatus::Corrupt, "corrupt" },
    skipped = { ScanFileStatus::Skipped, "skipped" },
    inaccessible = { ScanFileStatus::Inaccessible, "inaccessible" },
)]
fn scan_file_status_round_trip(status: ScanFileStatus, s: &str) {
    assert_eq!(status.to_string(), s);
    assert_eq!(ScanFileStatus::parse(s), Some(status));
}
