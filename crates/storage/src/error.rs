// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error type.

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode/decode stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corruption aggregate {0} must start with corruption:detected")]
    FirstEventNotDetection(String),

    #[error("no such scan: {0}")]
    ScanNotFound(i64),
}
