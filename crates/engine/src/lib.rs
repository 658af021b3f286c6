// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedarr-engine: the orchestration core.
//!
//! Services communicate exclusively through the event bus; each service owns
//! its in-memory state and one phase of the corruption lifecycle:
//!
//! scanner → `CorruptionDetected` → remediator → `SearchCompleted` →
//! verifier → terminal event or failure → retry monitor → `RetryScheduled`
//! → remediator again.
//!
//! Ordering per aggregate holds because exactly one service owns the next
//! transition at any moment; handoff happens via the terminating event of
//! the previous phase. Keep it that way: do not add cross-service emission
//! paths.

pub mod bus;
pub mod config;
pub mod error;
pub mod monitor;
pub mod recovery;
pub mod remediator;
pub mod replay;
pub mod rescan;
pub mod scanner;
pub mod scheduler;
pub mod time;
pub mod verifier;

#[cfg(any(test, feature = "test-support"))]
pub mod recording;

pub use bus::{EventBus, Subscriber};
pub use config::{
    EngineConfig, MonitorConfig, RecoveryConfig, RescanConfig, ScannerConfig, VerifierConfig,
};
pub use error::EngineError;
pub use monitor::RetryMonitor;
pub use recovery::{RecoveryService, RecoverySummary};
pub use remediator::Remediator;
pub use replay::ReplayService;
pub use rescan::RescanWorker;
pub use scanner::{ActiveScanInfo, FileScanOutcome, ScanDispatch, Scanner};
pub use scheduler::{ScanScheduler, ScanTrigger};
pub use verifier::Verifier;
