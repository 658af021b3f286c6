// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs.
//!
//! Everything with a latency or overload consequence is configurable here;
//! the defaults mirror the values the services were designed around.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Files modified more recently than this are skipped (probably still
    /// being written).
    pub write_settle_window: Duration,
    /// Delay before the second stat of the size-stability gate.
    pub settle_recheck_delay: Duration,
    /// Corruption count at which a scan enters throttled mode.
    pub throttle_threshold: u32,
    /// Delay before each corruption publish while throttled.
    pub throttle_delay: Duration,
    /// Persist progress every N files.
    pub progress_interval: usize,
    /// Scan-path config cache TTL.
    pub path_cache_ttl: Duration,
    /// Window for the duplicate-detection query.
    pub dedup_window: Duration,
    /// How long shutdown waits for scan tasks to park themselves.
    pub shutdown_grace: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            write_settle_window: Duration::from_secs(2 * 60),
            settle_recheck_delay: Duration::from_millis(500),
            throttle_threshold: 10,
            throttle_delay: Duration::from_secs(30),
            progress_interval: 10,
            path_cache_ttl: Duration::from_secs(60),
            dedup_window: Duration::from_secs(7 * 24 * 3600),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Base queue/history polling interval.
    pub interval: Duration,
    /// Overall verification deadline; scan paths may override it in hours.
    pub timeout: Duration,
    /// Cap for the empty-queue polling backoff.
    pub queue_backoff_cap: Duration,
    /// Cap for the media-id-less file polling backoff.
    pub file_poll_cap: Duration,
    /// History fetch attempts (backoffs 1s/2s/4s).
    pub history_retries: u32,
    /// History page size per fetch.
    pub history_limit: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(6 * 3600),
            queue_backoff_cap: Duration::from_secs(10 * 60),
            file_poll_cap: Duration::from_secs(24 * 3600),
            history_retries: 3,
            history_limit: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub default_max_retries: u32,
    /// First retry delay; doubles per prior failure.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_max_retries: remedarr_core::scan_path::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(15 * 60),
            max_delay: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Age past which a non-terminal aggregate counts as stale. The type
    /// being unsigned, there is no negative value to fall back from.
    pub stale_threshold: Duration,
    pub default_max_retries: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stale_threshold: Duration::from_secs(24 * 3600),
            default_max_retries: remedarr_core::scan_path::DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RescanConfig {
    /// Worker tick interval.
    pub tick: Duration,
    /// Rows reinspected per tick.
    pub batch: usize,
    /// Same dedup window the scanner uses.
    pub dedup_window: Duration,
}

impl Default for RescanConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5 * 60),
            batch: 50,
            dedup_window: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Aggregate engine configuration, built by the daemon from its config file.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub scanner: ScannerConfig,
    pub verifier: VerifierConfig,
    pub monitor: MonitorConfig,
    pub recovery: RecoveryConfig,
    pub rescan: RescanConfig,
}
