// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! remedarr-adapters: boundaries to the outside world.
//!
//! The engine never talks HTTP or spawns probe processes directly; it goes
//! through the traits here. Production wiring supplies real arr clients and
//! a probe-command detector, tests supply the fakes.

pub mod arr;
pub mod detector;
pub mod http;
pub mod path_map;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use arr::{
    ArrClient, ArrRouter, DeleteResponse, HistoryItemInfo, MediaDetails, QueueItemInfo,
    TrackedDownloadState,
};
pub use detector::{CommandDetector, HealthDetector};
pub use http::{ArrKind, HttpArrClient};
pub use path_map::PathMapper;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeArrClient, FakeDetector};

/// Errors produced by external-service adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("arr api error: {0}")]
    Api(String),

    #[error("media not found for {0}")]
    MediaNotFound(String),

    #[error("no path mapping covers {0}")]
    NoMapping(String),

    #[error("adapter timeout after {0:?}")]
    Timeout(std::time::Duration),
}
