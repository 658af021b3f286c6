// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-check error taxonomy.
//!
//! The detector reports either "healthy" or a typed error. The error types
//! partition into infrastructure failures (the mount died, permissions are
//! wrong, the file itself may be fine) and true corruption (the file's
//! contents are bad). Infrastructure errors must never trigger remediation;
//! they queue the file for a later rescan instead.

use serde::{Deserialize, Serialize};

/// Classification of a failed health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthErrorKind {
    // Infrastructure (recoverable): the file may be fine.
    AccessDenied,
    PathNotFound,
    MountLost,
    IoError,
    Timeout,
    InvalidConfig,
    // True corruption: the file's contents are bad.
    CorruptHeader,
    CorruptStream,
    ZeroByte,
    InvalidFormat,
    /// Unrecognized detector classification. Treated as corruption.
    Other,
}

crate::simple_display! {
    HealthErrorKind {
        AccessDenied => "access_denied",
        PathNotFound => "path_not_found",
        MountLost => "mount_lost",
        IoError => "io_error",
        Timeout => "timeout",
        InvalidConfig => "invalid_config",
        CorruptHeader => "corrupt_header",
        CorruptStream => "corrupt_stream",
        ZeroByte => "zero_byte",
        InvalidFormat => "invalid_format",
        Other => "other",
    }
}

impl HealthErrorKind {
    /// True for infrastructure failures that warrant a rescan rather than
    /// remediation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied
                | Self::PathNotFound
                | Self::MountLost
                | Self::IoError
                | Self::Timeout
                | Self::InvalidConfig
        )
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "access_denied" => Self::AccessDenied,
            "path_not_found" => Self::PathNotFound,
            "mount_lost" => Self::MountLost,
            "io_error" => Self::IoError,
            "timeout" => Self::Timeout,
            "invalid_config" => Self::InvalidConfig,
            "corrupt_header" => Self::CorruptHeader,
            "corrupt_stream" => Self::CorruptStream,
            "zero_byte" => Self::ZeroByte,
            "invalid_format" => Self::InvalidFormat,
            _ => Self::Other,
        }
    }
}

/// A failed health check: classification plus the detector's message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct HealthCheckError {
    pub kind: HealthErrorKind,
    pub message: String,
}

impl HealthCheckError {
    pub fn new(kind: HealthErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }

    /// Classify an I/O error from a stat or read, sniffing the message for
    /// mount-loss indicators before falling back on the error kind.
    pub fn from_io(err: &std::io::Error) -> Self {
        let message = err.to_string();
        let kind = if looks_like_mount_loss(&message) {
            HealthErrorKind::MountLost
        } else {
            match err.kind() {
                std::io::ErrorKind::PermissionDenied => HealthErrorKind::AccessDenied,
                std::io::ErrorKind::NotFound => HealthErrorKind::PathNotFound,
                std::io::ErrorKind::TimedOut => HealthErrorKind::Timeout,
                _ => HealthErrorKind::IoError,
            }
        };
        Self { kind, message }
    }
}

/// Does an error message look like a lost network mount?
///
/// Matches the strings NFS/FUSE/CIFS produce when the backing mount goes
/// away: "stale file handle", "transport endpoint is not connected",
/// "no such device".
pub fn looks_like_mount_loss(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["stale", "transport endpoint", "no such device"].iter().any(|ind| lower.contains(ind))
}

/// Detector invocation depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Header/container probe only.
    #[default]
    Quick,
    /// Full stream decode. Used when verifying replacements.
    Thorough,
}

crate::simple_display! {
    DetectionMode {
        Quick => "quick",
        Thorough => "thorough",
    }
}

/// Per-scan-path detector configuration, snapshotted into each scan record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Probe tool to invoke (e.g. `ffprobe`).
    pub method: String,
    #[serde(default)]
    pub mode: DetectionMode,
    /// Extra arguments appended to the probe invocation.
    #[serde(default)]
    pub args: Vec<String>,
}

impl DetectionConfig {
    pub fn with_mode(&self, mode: DetectionMode) -> Self {
        Self { mode, ..self.clone() }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
