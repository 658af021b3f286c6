// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File health detector interface and the probe-command adapter.

use async_trait::async_trait;
use remedarr_core::health::{
    DetectionConfig, DetectionMode, HealthCheckError, HealthErrorKind,
};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Checks whether a media file is healthy.
///
/// `Ok(())` means healthy; the error carries the failure classification
/// (see [`HealthCheckError::is_recoverable`]).
#[async_trait]
pub trait HealthDetector: Send + Sync + 'static {
    async fn check(&self, path: &Path, mode: DetectionMode) -> Result<(), HealthCheckError>;

    async fn check_with_config(
        &self,
        path: &Path,
        config: &DetectionConfig,
    ) -> Result<(), HealthCheckError>;
}

/// Detector that shells out to a probe command (ffprobe by default).
///
/// Remedarr does not parse media containers itself; the probe tool does the
/// actual inspection and this adapter classifies its outcome.
pub struct CommandDetector {
    timeout: Duration,
}

impl CommandDetector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_probe(
        &self,
        path: &Path,
        config: &DetectionConfig,
    ) -> Result<(), HealthCheckError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| HealthCheckError::from_io(&e))?;
        if metadata.len() == 0 {
            return Err(HealthCheckError::new(HealthErrorKind::ZeroByte, "file is empty"));
        }

        let method = if config.method.is_empty() { "ffprobe" } else { &config.method };
        let mut cmd = tokio::process::Command::new(method);
        cmd.arg("-v").arg("error");
        match config.mode {
            DetectionMode::Quick => {
                cmd.args(["-show_entries", "format=format_name,duration"]);
            }
            DetectionMode::Thorough => {
                // Decode the full stream so mid-file damage is caught.
                cmd.args(["-count_packets", "-show_entries", "stream=nb_read_packets"]);
            }
        }
        cmd.args(&config.args);
        cmd.arg(path);
        cmd.kill_on_drop(true);

        debug!(path = %path.display(), method, mode = %config.mode, "running probe");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| HealthCheckError::from_io(&e))?,
            Err(_) => {
                return Err(HealthCheckError::new(
                    HealthErrorKind::Timeout,
                    format!("probe exceeded {:?}", self.timeout),
                ));
            }
        };

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_probe_failure(&stderr))
    }
}

impl Default for CommandDetector {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

/// Map probe stderr to the corruption taxonomy.
fn classify_probe_failure(stderr: &str) -> HealthCheckError {
    let lower = stderr.to_ascii_lowercase();
    let first_line = stderr.lines().next().unwrap_or("probe failed").to_string();
    let kind = if remedarr_core::health::looks_like_mount_loss(&lower) {
        HealthErrorKind::MountLost
    } else if lower.contains("permission denied") {
        HealthErrorKind::AccessDenied
    } else if lower.contains("no such file") {
        HealthErrorKind::PathNotFound
    } else if lower.contains("moov atom not found")
        || lower.contains("ebml header")
        || lower.contains("invalid header")
    {
        HealthErrorKind::CorruptHeader
    } else if lower.contains("invalid data found") {
        HealthErrorKind::InvalidFormat
    } else {
        HealthErrorKind::CorruptStream
    };
    HealthCheckError::new(kind, first_line)
}

#[async_trait]
impl HealthDetector for CommandDetector {
    async fn check(&self, path: &Path, mode: DetectionMode) -> Result<(), HealthCheckError> {
        let config = DetectionConfig { method: String::new(), mode, args: Vec::new() };
        self.run_probe(path, &config).await
    }

    async fn check_with_config(
        &self,
        path: &Path,
        config: &DetectionConfig,
    ) -> Result<(), HealthCheckError> {
        self.run_probe(path, config).await
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
