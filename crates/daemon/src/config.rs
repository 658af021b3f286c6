// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a TOML file plus `REMEDARR_*` env overrides.

use remedarr_adapters::ArrKind;
use remedarr_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root for the database, lock file, and logs.
    pub state_dir: PathBuf,
    /// `tracing` env-filter directive.
    pub log_filter: String,
    pub arr: Vec<ArrInstance>,
    pub probe_timeout_secs: u64,
    pub verification: VerificationSection,
    pub retries: RetrySection,
    pub recovery: RecoverySection,
    pub scanner: ScannerSection,
    pub rescan: RescanSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArrInstance {
    pub name: String,
    /// `radarr` or `sonarr`.
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    /// Arr-namespace root this instance owns, e.g. `/data/movies`.
    pub root: String,
}

impl ArrInstance {
    pub fn arr_kind(&self) -> Option<ArrKind> {
        match self.kind.to_ascii_lowercase().as_str() {
            "radarr" => Some(ArrKind::Radarr),
            "sonarr" => Some(ArrKind::Sonarr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationSection {
    pub interval_secs: u64,
    pub timeout_hours: u64,
}

impl Default for VerificationSection {
    fn default() -> Self {
        Self { interval_secs: 30, timeout_hours: 6 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub default_max: u32,
    pub base_delay_mins: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self { default_max: 3, base_delay_mins: 15 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoverySection {
    pub stale_threshold_hours: u64,
}

impl Default for RecoverySection {
    fn default() -> Self {
        Self { stale_threshold_hours: 24 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerSection {
    pub write_settle_secs: u64,
    pub throttle_threshold: u32,
    pub throttle_delay_secs: u64,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self { write_settle_secs: 120, throttle_threshold: 10, throttle_delay_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RescanSection {
    pub tick_secs: u64,
    pub batch: usize,
}

impl Default for RescanSection {
    fn default() -> Self {
        Self { tick_secs: 300, batch: 50 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/remedarr"),
            log_filter: "info".into(),
            arr: Vec::new(),
            probe_timeout_secs: 120,
            verification: VerificationSection::default(),
            retries: RetrySection::default(),
            recovery: RecoverySection::default(),
            scanner: ScannerSection::default(),
            rescan: RescanSection::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file (missing file means defaults), then apply env
    /// overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };
        if let Ok(dir) = std::env::var("REMEDARR_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = std::env::var("REMEDARR_LOG_FILTER") {
            config.log_filter = filter;
        }
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("remedarr.sqlite3")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("remedarrd.lock")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        engine.scanner.write_settle_window = Duration::from_secs(self.scanner.write_settle_secs);
        engine.scanner.throttle_threshold = self.scanner.throttle_threshold;
        engine.scanner.throttle_delay = Duration::from_secs(self.scanner.throttle_delay_secs);
        engine.verifier.interval = Duration::from_secs(self.verification.interval_secs);
        engine.verifier.timeout = Duration::from_secs(self.verification.timeout_hours * 3600);
        engine.monitor.default_max_retries = self.retries.default_max;
        engine.monitor.base_delay = Duration::from_secs(self.retries.base_delay_mins * 60);
        engine.recovery.stale_threshold =
            Duration::from_secs(self.recovery.stale_threshold_hours * 3600);
        engine.recovery.default_max_retries = self.retries.default_max;
        engine.rescan.tick = Duration::from_secs(self.rescan.tick_secs);
        engine.rescan.batch = self.rescan.batch;
        engine
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
