// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type.

use remedarr_core::cron::CronError;
use remedarr_core::health::HealthCheckError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("event bus is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(#[from] remedarr_storage::StoreError),

    #[error(transparent)]
    Adapter(#[from] remedarr_adapters::AdapterError),

    #[error(transparent)]
    Cron(#[from] CronError),

    #[error("no enabled scan path covers {0}")]
    NoScanPath(String),

    #[error("scan path {0} not found or disabled")]
    ScanPathNotFound(i64),

    #[error("scan {0} is not active")]
    ScanNotActive(i64),

    #[error("schedule {0} not found")]
    ScheduleNotFound(i64),

    #[error("pre-flight check failed for {path}: {error}")]
    Preflight { path: String, error: HealthCheckError },
}
