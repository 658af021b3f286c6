// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedarr-core: domain types for the Remedarr self-healing media daemon

pub mod macros;

pub mod clock;
pub mod corruption;
pub mod cron;
pub mod event;
pub mod health;
pub mod id;
pub mod media;
pub mod rescan;
pub mod scan;
pub mod scan_path;
pub mod schedule;

pub use clock::{Clock, FakeClock, SystemClock, TimerHandle};
pub use corruption::{CorruptionState, CorruptionStatus, StateClass};
pub use cron::{CronError, CronExpr};
pub use event::{AggregateType, Event, EventKind, EventRecord};
pub use health::{
    DetectionConfig, DetectionMode, HealthCheckError, HealthErrorKind, looks_like_mount_loss,
};
pub use id::CorruptionId;
pub use media::is_eligible_media_file;
pub use rescan::{PendingRescan, RescanResolution, RescanStatus, DEFAULT_RESCAN_MAX_RETRIES};
pub use scan::{Scan, ScanFileRecord, ScanFileStatus, ScanStatus};
pub use scan_path::{ScanPath, DEFAULT_MAX_RETRIES};
pub use schedule::ScanSchedule;
