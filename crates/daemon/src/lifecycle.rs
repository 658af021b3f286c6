// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: subscriptions attach before event replay, replay
//! runs before recovery, and only then does runtime traffic start
//! (interrupted scans, the scheduler, the rescan worker).

use crate::config::Config;
use fs2::FileExt;
use remedarr_adapters::{
    ArrClient, ArrRouter, CommandDetector, HttpArrClient, PathMapper,
};
use remedarr_core::clock::SystemClock;
use remedarr_engine::{
    EventBus, RecoveryService, Remediator, ReplayService, RescanWorker, ScanDispatch,
    ScanScheduler, Scanner, Verifier,
};
use remedarr_storage::Store;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("another remedarrd instance holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error(transparent)]
    Store(#[from] remedarr_storage::StoreError),

    #[error(transparent)]
    Engine(#[from] remedarr_engine::EngineError),

    #[error("no arr instances configured")]
    NoArrInstances,

    #[error("arr instance {0} has unknown kind {1:?}")]
    UnknownArrKind(String, String),
}

type DaemonScanner = Scanner<SystemClock, CommandDetector>;

/// Handles to every running service, used for ordered shutdown.
pub struct Daemon {
    bus: Arc<EventBus<SystemClock>>,
    scanner: Arc<DaemonScanner>,
    verifier: Arc<Verifier<SystemClock, CommandDetector>>,
    remediator: Arc<Remediator<SystemClock>>,
    monitor: Arc<remedarr_engine::RetryMonitor<SystemClock>>,
    scheduler: Arc<ScanScheduler<SystemClock>>,
    rescan: Arc<RescanWorker<SystemClock, CommandDetector>>,
    rescan_handle: tokio::task::JoinHandle<()>,
    _lock_file: std::fs::File,
}

/// Bring the daemon up. See the module docs for the ordering contract.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(config.log_dir())?;

    // Acquire the lock before touching any shared state. Avoid truncating
    // before the lock is held: the file may carry a live daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(config.lock_path())?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let store = Store::open(&config.database_path())?;
    let clock = SystemClock;
    let engine_config = config.engine_config();

    // Adapters
    let scan_paths = store.enabled_scan_paths()?;
    let mapper = Arc::new(PathMapper::new(&scan_paths));
    let detector = Arc::new(CommandDetector::new(config.probe_timeout()));
    let arr = build_arr_router(config)?;

    // Event bus and services
    let bus = Arc::new(EventBus::new(store.clone(), clock.clone()));
    let scanner = Arc::new(Scanner::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::clone(&detector),
        clock.clone(),
        engine_config.scanner.clone(),
    ));
    let remediator = Remediator::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::clone(&arr),
        Arc::clone(&mapper),
    );
    let verifier = Verifier::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::clone(&arr),
        Arc::clone(&mapper),
        Arc::clone(&detector),
        clock.clone(),
        engine_config.verifier.clone(),
    );
    let monitor = remedarr_engine::RetryMonitor::new(
        Arc::clone(&bus),
        store.clone(),
        clock.clone(),
        engine_config.monitor.clone(),
    );
    let scheduler = ScanScheduler::new(
        store.clone(),
        clock.clone(),
        Arc::new(ScanDispatch(Arc::clone(&scanner))),
    );
    let rescan = RescanWorker::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::clone(&detector),
        clock.clone(),
        engine_config.rescan.clone(),
    );

    // 1. Subscriptions
    remediator.subscribe(&bus);
    verifier.subscribe(&bus);
    monitor.subscribe(&bus);

    // 2. Replay persisted-but-unhandled detections
    let replayed = ReplayService::new(Arc::clone(&bus), store.clone()).run().await?;
    if replayed > 0 {
        info!(replayed, "redelivered unhandled detections");
    }

    // 3. Reconcile stale in-progress aggregates
    RecoveryService::new(
        Arc::clone(&bus),
        store.clone(),
        Arc::clone(&arr),
        Arc::clone(&mapper),
        Arc::clone(&detector),
        clock.clone(),
        engine_config.recovery.clone(),
    )
    .run()
    .await?;

    // 4. Runtime traffic
    let resumed = scanner.resume_interrupted_scans()?;
    if resumed > 0 {
        info!(resumed, "resumed interrupted scans");
    }
    scheduler.cleanup_orphaned_schedules()?;
    scheduler.start()?;
    let rescan_handle = rescan.start();

    info!(
        db = %config.database_path().display(),
        scan_paths = scan_paths.len(),
        arr_instances = config.arr.len(),
        "remedarrd started"
    );

    Ok(Daemon {
        bus,
        scanner,
        verifier,
        remediator,
        monitor,
        scheduler,
        rescan,
        rescan_handle,
        _lock_file: lock_file,
    })
}

fn build_arr_router(config: &Config) -> Result<Arc<dyn ArrClient>, LifecycleError> {
    if config.arr.is_empty() {
        return Err(LifecycleError::NoArrInstances);
    }
    let mut routes: Vec<(String, Arc<dyn ArrClient>)> = Vec::new();
    for instance in &config.arr {
        let kind = instance.arr_kind().ok_or_else(|| {
            LifecycleError::UnknownArrKind(instance.name.clone(), instance.kind.clone())
        })?;
        info!(name = %instance.name, kind = %instance.kind, root = %instance.root, "arr instance");
        routes.push((
            instance.root.clone(),
            Arc::new(HttpArrClient::new(
                kind,
                &instance.base_url,
                &instance.api_key,
                &instance.name,
            )),
        ));
    }
    Ok(Arc::new(ArrRouter::new(routes)))
}

impl Daemon {
    /// Ordered shutdown: stop producers first, then drain consumers.
    pub async fn shutdown(self) {
        info!("remedarrd shutting down");
        self.scheduler.stop();
        self.rescan.stop();
        self.rescan_handle.abort();
        self.scanner.shutdown().await;
        self.monitor.stop();
        self.remediator.shutdown().await;
        self.verifier.shutdown().await;
        self.bus.shutdown().await;
        if let Err(e) = fs2::FileExt::unlock(&self._lock_file) {
            warn!(error = %e, "failed to release lock file");
        }
    }
}
