// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-rescan records.
//!
//! A file that failed an infrastructure check (mount lost, IO error, …) is
//! queued here for later reinspection instead of being treated as corrupt.

use crate::health::HealthErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default reinspection attempts before a file is abandoned.
pub const DEFAULT_RESCAN_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanStatus {
    Pending,
    Resolved,
    Abandoned,
}

crate::simple_display! {
    RescanStatus {
        Pending => "pending",
        Resolved => "resolved",
        Abandoned => "abandoned",
    }
}

impl RescanStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanResolution {
    Healthy,
    Corrupt,
    Abandoned,
}

crate::simple_display! {
    RescanResolution {
        Healthy => "healthy",
        Corrupt => "corrupt",
        Abandoned => "abandoned",
    }
}

impl RescanResolution {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(Self::Healthy),
            "corrupt" => Some(Self::Corrupt),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRescan {
    pub id: i64,
    pub file_path: String,
    pub path_id: i64,
    pub error_type: HealthErrorKind,
    pub error_message: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: DateTime<Utc>,
    pub status: RescanStatus,
    pub resolution: Option<RescanResolution>,
}

/// Exponential rescan backoff: `5 * 2^min(retry_count, 5)` minutes.
pub fn rescan_backoff(retry_count: u32) -> Duration {
    let factor = 1u64 << retry_count.min(5);
    Duration::from_secs(5 * 60 * factor)
}

#[cfg(test)]
#[path = "rescan_tests.rs"]
mod tests;
