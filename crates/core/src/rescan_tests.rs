// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn backoff_doubles_per_retry() {
    assert_eq!(rescan_backoff(0), Duration::from_secs(5 * 60));
    assert_eq!(rescan_backoff(1), Duration::from_secs(10 * 60));
    assert_eq!(rescan_backoff(2), Duration::from_secs(20 * 60));
    assert_eq!(rescan_backoff(5), Duration::from_secs(160 * 60));
}

#[test]
fn backoff_caps_at_five_doublings() {
    assert_eq!(rescan_backoff(6), rescan_backoff(5));
    assert_eq!(rescan_backoff(u32::MAX), rescan_backoff(5));
}

#[test]
fn status_and_resolution_round_trip() {
    for status in [RescanStatus::Pending, RescanStatus::Resolved, RescanStatus::Abandoned] {
        assert_eq!(RescanStatus::parse(&status.to_string()), Some(status));
    }
    for res in
        [RescanResolution::Healthy, RescanResolution::Corrupt, RescanResolution::Abandoned]
    {
        assert_eq!(RescanResolution::parse(&res.to_string()), Some(res));
    }
    assert_eq!(RescanStatus::parse("nope"), None);
}
