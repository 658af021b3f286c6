// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-scan execution records.

use crate::health::{DetectionConfig, HealthErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Running,
    Paused,
    /// Stopped by daemon shutdown; resumable from `current_file_index`.
    Interrupted,
    Completed,
    Cancelled,
    /// Stopped by the scanner itself (e.g. mount loss mid-scan).
    Aborted,
}

crate::simple_display! {
    ScanStatus {
        Running => "running",
        Paused => "paused",
        Interrupted => "interrupted",
        Completed => "completed",
        Cancelled => "cancelled",
        Aborted => "aborted",
    }
}

impl ScanStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "interrupted" => Some(Self::Interrupted),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Aborted)
    }
}

/// A scan execution record. The `file_list` snapshot makes interrupted
/// scans resumable across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: i64,
    pub path: String,
    pub path_id: i64,
    pub status: ScanStatus,
    pub total_files: usize,
    pub files_scanned: usize,
    pub current_file_index: usize,
    pub file_list: Vec<String>,
    pub detection: DetectionConfig,
    pub auto_remediate: bool,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of one file within a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFileStatus {
    Healthy,
    Corrupt,
    Skipped,
    Inaccessible,
}

crate::simple_display! {
    ScanFileStatus {
        Healthy => "healthy",
        Corrupt => "corrupt",
        Skipped => "skipped",
        Inaccessible => "inaccessible",
    }
}

impl ScanFileStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(Self::Healthy),
            "corrupt" => Some(Self::Corrupt),
            "skipped" => Some(Self::Skipped),
            "inaccessible" => Some(Self::Inaccessible),
            _ => None,
        }
    }
}

/// Per-file audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFileRecord {
    pub scan_id: i64,
    pub file_path: String,
    pub status: ScanFileStatus,
    pub corruption_type: Option<HealthErrorKind>,
    pub error_details: Option<String>,
    pub file_size: Option<i64>,
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
