// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled-scan configuration.

use serde::{Deserialize, Serialize};

/// A cron-driven scan trigger bound to a scan path.
///
/// Disabled schedules are persisted but never registered with the
/// scheduler. The expression is validated at add/update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSchedule {
    pub id: i64,
    pub scan_path_id: i64,
    /// Standard 5-field cron expression.
    pub cron_expression: String,
    pub enabled: bool,
}
