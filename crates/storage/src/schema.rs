// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite schema, applied through integer-versioned migrations.
//!
//! Timestamps are stored as UTC microseconds in INTEGER columns. JSON
//! columns (`event_data`, `file_list`, `detection_config`) hold
//! serde-encoded values.

/// Migration v1: the full initial schema.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    aggregate_type TEXT NOT NULL,
    aggregate_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    event_data TEXT NOT NULL,
    event_version INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    user_id TEXT,
    UNIQUE (aggregate_id, event_version)
);

CREATE INDEX IF NOT EXISTS idx_events_aggregate_created
    ON events(aggregate_id, created_at);

CREATE INDEX IF NOT EXISTS idx_events_type_created
    ON events(event_type, created_at);

CREATE TABLE IF NOT EXISTS corruption_status (
    corruption_id TEXT PRIMARY KEY,
    current_state TEXT NOT NULL,
    file_path TEXT NOT NULL,
    path_id INTEGER NOT NULL,
    media_id INTEGER,
    retry_count INTEGER NOT NULL DEFAULT 0,
    last_updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_corruption_status_state_updated
    ON corruption_status(current_state, last_updated_at);

CREATE TABLE IF NOT EXISTS scan_paths (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    local_path TEXT NOT NULL UNIQUE,
    arr_path TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    auto_remediate INTEGER NOT NULL DEFAULT 1,
    dry_run INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3,
    verification_timeout_hours INTEGER,
    detection_config TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    path_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    total_files INTEGER NOT NULL DEFAULT 0,
    files_scanned INTEGER NOT NULL DEFAULT 0,
    current_file_index INTEGER NOT NULL DEFAULT 0,
    file_list TEXT NOT NULL DEFAULT '[]',
    detection_config TEXT NOT NULL DEFAULT '{}',
    auto_remediate INTEGER NOT NULL DEFAULT 1,
    dry_run INTEGER NOT NULL DEFAULT 0,
    started_at INTEGER NOT NULL,
    completed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status);

CREATE TABLE IF NOT EXISTS scan_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id INTEGER NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
    file_path TEXT NOT NULL,
    status TEXT NOT NULL,
    corruption_type TEXT,
    error_details TEXT,
    file_size INTEGER
);

CREATE INDEX IF NOT EXISTS idx_scan_files_scan ON scan_files(scan_id);

CREATE TABLE IF NOT EXISTS pending_rescans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL UNIQUE,
    path_id INTEGER NOT NULL,
    error_type TEXT NOT NULL,
    error_message TEXT NOT NULL DEFAULT '',
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 5,
    next_retry_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    resolution TEXT
);

CREATE INDEX IF NOT EXISTS idx_pending_rescans_due
    ON pending_rescans(status, next_retry_at);

CREATE TABLE IF NOT EXISTS scan_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_path_id INTEGER NOT NULL,
    cron_expression TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS schema_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO schema_meta (id, schema_version) VALUES (1, 1);
"#;

/// Latest schema version; bump when adding a migration.
pub const LATEST_SCHEMA_VERSION: i64 = 1;

/// Apply pending migrations inside a transaction.
pub fn migrate(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let version = current_schema_version(&tx)?;
    if version < 1 {
        tx.execute_batch(MIGRATION_V1_SQL)?;
    }
    tx.execute(
        "UPDATE schema_meta SET schema_version = ?1 WHERE id = 1",
        [LATEST_SCHEMA_VERSION],
    )?;
    tx.commit()
}

/// Read the schema version, treating a fresh database as version 0.
pub fn current_schema_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_meta')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }
    conn.query_row("SELECT schema_version FROM schema_meta WHERE id = 1", [], |row| row.get(0))
}
