// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedarr-storage: SQLite persistence for the event log and the
//! scanner/scheduler tables.
//!
//! The `events` table is the system's source of truth; everything else is
//! either configuration (`scan_paths`, `scan_schedules`), bookkeeping
//! (`scans`, `scan_files`, `pending_rescans`), or a rebuildable projection
//! (`corruption_status`).

mod db;
mod error;
mod event_log;
mod projection;
mod rescans;
mod scan_paths;
mod scans;
mod schedules;
mod schema;

pub use db::Store;
pub use error::StoreError;
pub use scans::NewScan;
