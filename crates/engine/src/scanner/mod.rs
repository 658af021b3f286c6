// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scanner: turns scan-path directives into `CorruptionDetected` events.
//!
//! The hard part is not finding bad files, it is not crying wolf.
//! Infrastructure failures (dead mounts, permission problems) must never
//! look like corruption, files still being written must be left alone, and
//! a scan that finds a pile of corruption at once must not stampede the
//! arr. Every file therefore passes a settle gate, a size-stability gate,
//! and error classification before anything is published, and duplicate
//! detections are suppressed against the event log.

mod walk;

use crate::bus::EventBus;
use crate::config::ScannerConfig;
use crate::error::EngineError;
use crate::time::sleep_unless_cancelled;
use parking_lot::Mutex;
use remedarr_adapters::HealthDetector;
use remedarr_core::clock::Clock;
use remedarr_core::event::{AggregateType, Event};
use remedarr_core::health::{DetectionConfig, HealthCheckError, HealthErrorKind};
use remedarr_core::id::CorruptionId;
use remedarr_core::rescan::{rescan_backoff, DEFAULT_RESCAN_MAX_RETRIES};
use remedarr_core::scan::{ScanFileRecord, ScanFileStatus, ScanStatus};
use remedarr_core::scan_path::{self, ScanPath};
use remedarr_storage::{NewScan, Store};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of a single-file scan (webhook path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScanOutcome {
    Healthy,
    /// True corruption found and a `CorruptionDetected` published.
    CorruptionPublished,
    /// Corruption found but an open aggregate already covers this path.
    Duplicate,
    Skipped(&'static str),
    /// Infrastructure error; the file was queued for rescan.
    Inaccessible(HealthErrorKind),
}

/// Live view of one running scan.
#[derive(Debug, Clone)]
pub struct ActiveScanInfo {
    pub scan_id: i64,
    pub path: String,
    pub status: ScanStatus,
    pub total_files: usize,
    pub files_scanned: usize,
    pub current_file_index: usize,
    pub corruptions_found: u32,
}

struct ActiveScan {
    info: ActiveScanInfo,
    pause: watch::Sender<bool>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

struct PathCache {
    loaded_at: Instant,
    paths: Vec<ScanPath>,
}

/// Everything a scan task needs, snapshotted at scan start so interrupted
/// scans resume against the same inputs.
struct ScanRun {
    scan_id: i64,
    path_id: i64,
    root: String,
    files: Vec<String>,
    start_index: usize,
    files_scanned_start: usize,
    detection: DetectionConfig,
    auto_remediate: bool,
    dry_run: bool,
}

enum FileOutcome {
    Healthy { size: i64 },
    Corrupt { error: HealthCheckError, size: i64 },
    Skipped(&'static str),
    Inaccessible(HealthCheckError),
    /// Mount loss: the whole scan must stop.
    Abort(HealthCheckError),
}

pub struct Scanner<C: Clock, D: HealthDetector + 'static> {
    bus: Arc<EventBus<C>>,
    store: Store,
    detector: Arc<D>,
    clock: C,
    config: ScannerConfig,
    active: Mutex<HashMap<i64, ActiveScan>>,
    files_in_progress: Mutex<HashSet<String>>,
    path_cache: Mutex<Option<PathCache>>,
    shutdown: CancellationToken,
}

impl<C: Clock, D: HealthDetector> Scanner<C, D> {
    pub fn new(
        bus: Arc<EventBus<C>>,
        store: Store,
        detector: Arc<D>,
        clock: C,
        config: ScannerConfig,
    ) -> Self {
        Self {
            bus,
            store,
            detector,
            clock,
            config,
            active: Mutex::new(HashMap::new()),
            files_in_progress: Mutex::new(HashSet::new()),
            path_cache: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    // -- public operations --

    /// Recursive directory scan. Enumerates eligible files, snapshots the
    /// list for resumability, and processes it on a background task.
    /// Returns the scan id.
    pub async fn scan_path(
        self: &Arc<Self>,
        path_id: i64,
        local_path: &str,
    ) -> Result<i64, EngineError> {
        let scan_path = self
            .store
            .scan_path(path_id)?
            .filter(|p| p.enabled)
            .ok_or(EngineError::ScanPathNotFound(path_id))?;

        self.preflight(local_path).await?;

        let root = local_path.to_string();
        let files = tokio::task::spawn_blocking({
            let root = root.clone();
            move || walk::enumerate_media_files(Path::new(&root))
        })
        .await
        .unwrap_or_default();

        let scan_id = self.store.create_scan(&NewScan {
            path: root.clone(),
            path_id,
            file_list: files.clone(),
            detection: scan_path.detection.clone(),
            auto_remediate: scan_path.auto_remediate,
            dry_run: scan_path.dry_run,
            started_at: self.clock.utc_now(),
        })?;

        info!(scan_id, path = %root, files = files.len(), "scan started");

        self.register_and_spawn(ScanRun {
            scan_id,
            path_id,
            root,
            files,
            start_index: 0,
            files_scanned_start: 0,
            detection: scan_path.detection,
            auto_remediate: scan_path.auto_remediate,
            dry_run: scan_path.dry_run,
        });
        Ok(scan_id)
    }

    /// Single-file scan (webhook path). No scan row is written.
    pub async fn scan_file(&self, local_path: &str) -> Result<FileScanOutcome, EngineError> {
        let Some(config) = self.scan_path_config(local_path)? else {
            return Err(EngineError::NoScanPath(local_path.to_string()));
        };

        if !self.begin_file(local_path) {
            return Ok(FileScanOutcome::Skipped("already_scanning"));
        }
        let outcome = self.probe_file(local_path, &config.detection, &self.shutdown).await;
        self.end_file(local_path);

        match outcome {
            FileOutcome::Healthy { .. } => Ok(FileScanOutcome::Healthy),
            FileOutcome::Skipped(reason) => Ok(FileScanOutcome::Skipped(reason)),
            FileOutcome::Inaccessible(error) | FileOutcome::Abort(error) => {
                if error.kind == HealthErrorKind::MountLost {
                    self.publish_degraded("mount_lost", Some(local_path), &error.message, None)
                        .await;
                }
                self.queue_rescan(local_path, config.id, &error).await;
                Ok(FileScanOutcome::Inaccessible(error.kind))
            }
            FileOutcome::Corrupt { error, .. } => {
                if self.is_duplicate_detection(local_path)? {
                    debug!(file = local_path, "corruption already being processed");
                    return Ok(FileScanOutcome::Duplicate);
                }
                self.publish_detected(
                    local_path,
                    config.id,
                    &error,
                    config.auto_remediate,
                    config.dry_run,
                    false,
                )
                .await;
                Ok(FileScanOutcome::CorruptionPublished)
            }
        }
    }

    pub fn pause_scan(&self, scan_id: i64) -> Result<(), EngineError> {
        let mut active = self.active.lock();
        let scan = active.get_mut(&scan_id).ok_or(EngineError::ScanNotActive(scan_id))?;
        let _ = scan.pause.send(true);
        scan.info.status = ScanStatus::Paused;
        drop(active);
        self.store.set_scan_status(scan_id, ScanStatus::Paused, None)?;
        Ok(())
    }

    pub fn resume_scan(&self, scan_id: i64) -> Result<(), EngineError> {
        let mut active = self.active.lock();
        let scan = active.get_mut(&scan_id).ok_or(EngineError::ScanNotActive(scan_id))?;
        let _ = scan.pause.send(false);
        scan.info.status = ScanStatus::Running;
        drop(active);
        self.store.set_scan_status(scan_id, ScanStatus::Running, None)?;
        Ok(())
    }

    pub fn cancel_scan(&self, scan_id: i64) -> Result<(), EngineError> {
        let active = self.active.lock();
        let scan = active.get(&scan_id).ok_or(EngineError::ScanNotActive(scan_id))?;
        scan.cancel.cancel();
        // A paused scan parks on the pause gate; wake it so it can exit.
        let _ = scan.pause.send(false);
        Ok(())
    }

    pub fn is_file_being_scanned(&self, path: &str) -> bool {
        self.files_in_progress.lock().contains(path)
    }

    pub fn is_path_being_scanned(&self, root: &str) -> bool {
        self.active.lock().values().any(|s| {
            s.info.path == root
                || scan_path::is_component_prefix(root, &s.info.path)
                || scan_path::is_component_prefix(&s.info.path, root)
        })
    }

    pub fn active_scans(&self) -> Vec<ActiveScanInfo> {
        self.active.lock().values().map(|s| s.info.clone()).collect()
    }

    /// Drop the scan-path config cache; the next lookup reloads it.
    pub fn invalidate_scan_path_cache(&self) {
        *self.path_cache.lock() = None;
    }

    /// Re-enter scans persisted as `interrupted`, continuing from their
    /// checkpointed file index. Called once at startup.
    pub fn resume_interrupted_scans(self: &Arc<Self>) -> Result<usize, EngineError> {
        let scans = self.store.interrupted_scans()?;
        let mut resumed = 0;
        for scan in scans {
            if scan.current_file_index >= scan.file_list.len() {
                // Interrupted after the last file; nothing left to do.
                self.store.set_scan_status(
                    scan.id,
                    ScanStatus::Completed,
                    Some(self.clock.utc_now()),
                )?;
                continue;
            }
            info!(
                scan_id = scan.id,
                path = %scan.path,
                from_index = scan.current_file_index,
                "resuming interrupted scan"
            );
            self.store.set_scan_status(scan.id, ScanStatus::Running, None)?;
            self.register_and_spawn(ScanRun {
                scan_id: scan.id,
                path_id: scan.path_id,
                root: scan.path,
                files: scan.file_list,
                start_index: scan.current_file_index,
                files_scanned_start: scan.files_scanned,
                detection: scan.detection,
                auto_remediate: scan.auto_remediate,
                dry_run: scan.dry_run,
            });
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Stop all scan tasks, persisting `interrupted` state for each.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let pending: Vec<(i64, tokio::task::JoinHandle<()>)> = {
            let mut active = self.active.lock();
            active
                .iter_mut()
                .filter_map(|(id, scan)| {
                    // Wake paused scans so they can observe the shutdown.
                    let _ = scan.pause.send(false);
                    scan.task.take().map(|t| (*id, t))
                })
                .collect()
        };
        for (scan_id, handle) in pending {
            if tokio::time::timeout(self.config.shutdown_grace, handle).await.is_err() {
                warn!(scan_id, "scan task did not stop within grace period");
                let _ = self.store.set_scan_status(scan_id, ScanStatus::Interrupted, None);
            }
        }
        self.active.lock().clear();
    }

    // -- pre-flight --

    /// Fail fast before walking: the root must exist, be a readable
    /// directory, and not be a half-dead mount.
    async fn preflight(&self, root: &str) -> Result<(), EngineError> {
        let fail = |error: HealthCheckError| EngineError::Preflight {
            path: root.to_string(),
            error,
        };

        let metadata = match tokio::fs::metadata(root).await {
            Ok(m) => m,
            Err(e) => {
                let error = HealthCheckError::from_io(&e);
                self.publish_degraded("preflight_failed", Some(root), &error.message, None).await;
                return Err(fail(error));
            }
        };
        if !metadata.is_dir() {
            let error =
                HealthCheckError::new(HealthErrorKind::InvalidConfig, "not a directory");
            self.publish_degraded("preflight_failed", Some(root), &error.message, None).await;
            return Err(fail(error));
        }

        // Stat one entry: a lost NFS/FUSE mount often lists but cannot stat.
        match tokio::fs::read_dir(root).await {
            Err(e) => {
                let error = HealthCheckError::from_io(&e);
                self.publish_degraded("preflight_failed", Some(root), &error.message, None).await;
                return Err(fail(error));
            }
            Ok(mut entries) => match entries.next_entry().await {
                Err(e) => {
                    let error = HealthCheckError::from_io(&e);
                    self.publish_degraded("preflight_failed", Some(root), &error.message, None)
                        .await;
                    return Err(fail(error));
                }
                Ok(Some(entry)) => {
                    if let Err(e) = entry.metadata().await {
                        let error = HealthCheckError::from_io(&e);
                        self.publish_degraded(
                            "preflight_failed",
                            Some(root),
                            &error.message,
                            None,
                        )
                        .await;
                        return Err(fail(error));
                    }
                }
                Ok(None) => {}
            },
        }
        Ok(())
    }

    // -- scan task --

    fn register_and_spawn(self: &Arc<Self>, run: ScanRun) {
        let scan_id = run.scan_id;
        let (pause_tx, pause_rx) = watch::channel(false);
        let cancel = self.shutdown.child_token();

        let info = ActiveScanInfo {
            scan_id,
            path: run.root.clone(),
            status: ScanStatus::Running,
            total_files: run.files.len(),
            files_scanned: run.files_scanned_start,
            current_file_index: run.start_index,
            corruptions_found: 0,
        };
        self.active.lock().insert(
            scan_id,
            ActiveScan { info, pause: pause_tx, cancel: cancel.clone(), task: None },
        );

        let scanner = Arc::clone(self);
        let task = tokio::spawn(async move {
            scanner.run_scan(run, cancel, pause_rx).await;
        });
        if let Some(entry) = self.active.lock().get_mut(&scan_id) {
            entry.task = Some(task);
        }
    }

    async fn run_scan(
        self: Arc<Self>,
        run: ScanRun,
        cancel: CancellationToken,
        mut pause_rx: watch::Receiver<bool>,
    ) {
        let total = run.files.len();
        let mut index = run.start_index;
        let mut files_scanned = run.files_scanned_start;
        let mut corruptions: u32 = 0;
        let mut throttled = false;

        while index < total {
            if self.shutdown.is_cancelled() {
                self.finish_scan(&run, ScanStatus::Interrupted, index, files_scanned, corruptions)
                    .await;
                return;
            }
            if cancel.is_cancelled() {
                self.finish_scan(&run, ScanStatus::Cancelled, index, files_scanned, corruptions)
                    .await;
                return;
            }

            // Pause gate: park until resumed, cancelled, or shut down.
            while *pause_rx.borrow() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        self.finish_scan(
                            &run, ScanStatus::Interrupted, index, files_scanned, corruptions,
                        ).await;
                        return;
                    }
                    _ = cancel.cancelled() => {
                        self.finish_scan(
                            &run, ScanStatus::Cancelled, index, files_scanned, corruptions,
                        ).await;
                        return;
                    }
                    changed = pause_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            let file = run.files[index].clone();
            if let Err(error) =
                self.scan_one(&file, &run, &cancel, &mut throttled, &mut corruptions).await
            {
                // Mount loss aborts the whole scan.
                self.publish_degraded(
                    "mount_lost",
                    Some(&run.root),
                    &error.message,
                    Some(corruptions),
                )
                .await;
                self.finish_scan(&run, ScanStatus::Aborted, index, files_scanned, corruptions)
                    .await;
                return;
            }

            index += 1;
            files_scanned += 1;
            self.update_active(run.scan_id, index, files_scanned, corruptions);

            if index % self.config.progress_interval == 0 || index == total {
                if let Err(e) = self.store.update_scan_progress(run.scan_id, index, files_scanned)
                {
                    warn!(scan_id = run.scan_id, error = %e, "failed to persist scan progress");
                }
                self.emit_progress(&run, ScanStatus::Running, index, files_scanned, corruptions)
                    .await;
            }
        }

        self.finish_scan(&run, ScanStatus::Completed, total, files_scanned, corruptions).await;
    }

    /// Process one file of a scan. `Err` means the scan must abort.
    async fn scan_one(
        &self,
        file: &str,
        run: &ScanRun,
        cancel: &CancellationToken,
        throttled: &mut bool,
        corruptions: &mut u32,
    ) -> Result<(), HealthCheckError> {
        if !self.begin_file(file) {
            self.record_file(run.scan_id, file, ScanFileStatus::Skipped, None, Some("already_scanning"), None);
            return Ok(());
        }
        let outcome = self.probe_file(file, &run.detection, cancel).await;
        self.end_file(file);

        match outcome {
            FileOutcome::Healthy { size } => {
                self.record_file(run.scan_id, file, ScanFileStatus::Healthy, None, None, Some(size));
            }
            FileOutcome::Skipped(reason) => {
                self.record_file(run.scan_id, file, ScanFileStatus::Skipped, None, Some(reason), None);
            }
            FileOutcome::Inaccessible(error) => {
                self.record_file(
                    run.scan_id,
                    file,
                    ScanFileStatus::Inaccessible,
                    Some(error.kind),
                    Some(error.message.as_str()),
                    None,
                );
                self.queue_rescan(file, run.path_id, &error).await;
            }
            FileOutcome::Abort(error) => {
                self.record_file(
                    run.scan_id,
                    file,
                    ScanFileStatus::Inaccessible,
                    Some(error.kind),
                    Some(error.message.as_str()),
                    None,
                );
                self.queue_rescan(file, run.path_id, &error).await;
                return Err(error);
            }
            FileOutcome::Corrupt { error, size } => {
                match self.is_duplicate_detection(file) {
                    Ok(true) => {
                        self.record_file(
                            run.scan_id,
                            file,
                            ScanFileStatus::Skipped,
                            None,
                            Some("already_processing"),
                            Some(size),
                        );
                        return Ok(());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(file, error = %e, "dedup query failed, publishing anyway");
                    }
                }
                self.record_file(
                    run.scan_id,
                    file,
                    ScanFileStatus::Corrupt,
                    Some(error.kind),
                    Some(error.message.as_str()),
                    Some(size),
                );
                *corruptions += 1;
                if !*throttled && *corruptions >= self.config.throttle_threshold {
                    *throttled = true;
                    info!(
                        scan_id = run.scan_id,
                        corruptions = *corruptions,
                        "entering throttled mode"
                    );
                    self.publish_degraded(
                        "corruption_batch",
                        Some(&run.root),
                        "corruption burst detected in a single scan",
                        Some(*corruptions),
                    )
                    .await;
                } else if *throttled
                    && !sleep_unless_cancelled(&self.clock, self.config.throttle_delay, cancel)
                        .await
                {
                    return Ok(());
                }
                self.publish_detected(
                    file,
                    run.path_id,
                    &error,
                    run.auto_remediate,
                    run.dry_run,
                    *throttled,
                )
                .await;
            }
        }
        Ok(())
    }

    /// Safety gates + detector, with classification.
    async fn probe_file(
        &self,
        file: &str,
        detection: &DetectionConfig,
        cancel: &CancellationToken,
    ) -> FileOutcome {
        let metadata = match tokio::fs::metadata(file).await {
            Ok(m) => m,
            Err(e) => return self.classify_stat_error(&e),
        };
        let size = metadata.len() as i64;

        // Gate 1: leave files alone while they may still be written.
        if let Ok(modified) = metadata.modified() {
            let mtime: chrono::DateTime<chrono::Utc> = modified.into();
            let age = self.clock.utc_now() - mtime;
            let settle = chrono::Duration::from_std(self.config.write_settle_window)
                .unwrap_or(chrono::Duration::zero());
            if age < settle {
                return FileOutcome::Skipped("recently_modified");
            }
        }

        // Gate 2: size must hold still across a short delay.
        if !sleep_unless_cancelled(&self.clock, self.config.settle_recheck_delay, cancel).await {
            return FileOutcome::Skipped("cancelled");
        }
        let recheck = match tokio::fs::metadata(file).await {
            Ok(m) => m,
            Err(e) => return self.classify_stat_error(&e),
        };
        if recheck.len() != metadata.len() {
            return FileOutcome::Skipped("active_download");
        }

        match self.detector.check_with_config(Path::new(file), detection).await {
            Ok(()) => FileOutcome::Healthy { size },
            Err(error) if error.kind == HealthErrorKind::MountLost => FileOutcome::Abort(error),
            Err(error) if error.is_recoverable() => FileOutcome::Inaccessible(error),
            Err(error) => FileOutcome::Corrupt { error, size },
        }
    }

    fn classify_stat_error(&self, e: &std::io::Error) -> FileOutcome {
        let error = HealthCheckError::from_io(e);
        if error.kind == HealthErrorKind::MountLost {
            FileOutcome::Abort(error)
        } else {
            FileOutcome::Inaccessible(error)
        }
    }

    // -- bookkeeping helpers --

    fn begin_file(&self, file: &str) -> bool {
        self.files_in_progress.lock().insert(file.to_string())
    }

    fn end_file(&self, file: &str) {
        self.files_in_progress.lock().remove(file);
    }

    fn is_duplicate_detection(&self, file: &str) -> Result<bool, EngineError> {
        Ok(self
            .store
            .recent_open_detection(file, self.config.dedup_window, self.clock.utc_now())?
            .is_some())
    }

    fn record_file(
        &self,
        scan_id: i64,
        file: &str,
        status: ScanFileStatus,
        corruption_type: Option<HealthErrorKind>,
        details: Option<&str>,
        size: Option<i64>,
    ) {
        let record = ScanFileRecord {
            scan_id,
            file_path: file.to_string(),
            status,
            corruption_type,
            error_details: details.map(String::from),
            file_size: size,
        };
        if let Err(e) = self.store.record_scan_file(&record) {
            warn!(scan_id, file, error = %e, "failed to record scan file");
        }
    }

    async fn queue_rescan(&self, file: &str, path_id: i64, error: &HealthCheckError) {
        let next_retry_at = self.clock.utc_now()
            + chrono::Duration::from_std(rescan_backoff(0)).unwrap_or(chrono::Duration::zero());
        if let Err(e) = self.store.upsert_pending_rescan(
            file,
            path_id,
            error,
            next_retry_at,
            DEFAULT_RESCAN_MAX_RETRIES,
        ) {
            warn!(file, error = %e, "failed to queue pending rescan");
        }
    }

    async fn publish_detected(
        &self,
        file: &str,
        path_id: i64,
        error: &HealthCheckError,
        auto_remediate: bool,
        dry_run: bool,
        batch_throttled: bool,
    ) {
        let corruption_id = CorruptionId::new();
        let event = Event::CorruptionDetected {
            file_path: file.to_string(),
            path_id,
            corruption_type: error.kind,
            error_details: error.message.clone(),
            auto_remediate,
            dry_run,
            batch_throttled,
        };
        if let Err(e) =
            self.bus.publish(AggregateType::Corruption, corruption_id.as_str(), event).await
        {
            warn!(file, error = %e, "failed to publish corruption");
        }
    }

    async fn publish_degraded(
        &self,
        reason: &str,
        path: Option<&str>,
        details: &str,
        corruption_count: Option<u32>,
    ) {
        let event = Event::SystemHealthDegraded {
            reason: reason.to_string(),
            path: path.map(String::from),
            details: Some(details.to_string()),
            corruption_count,
        };
        if let Err(e) = self.bus.publish(AggregateType::System, "system", event).await {
            warn!(reason, error = %e, "failed to publish health degradation");
        }
    }

    fn update_active(&self, scan_id: i64, index: usize, files_scanned: usize, corruptions: u32) {
        if let Some(scan) = self.active.lock().get_mut(&scan_id) {
            scan.info.current_file_index = index;
            scan.info.files_scanned = files_scanned;
            scan.info.corruptions_found = corruptions;
        }
    }

    async fn emit_progress(
        &self,
        run: &ScanRun,
        status: ScanStatus,
        index: usize,
        files_scanned: usize,
        corruptions: u32,
    ) {
        self.bus
            .emit_transient(
                AggregateType::Scan,
                &run.scan_id.to_string(),
                Event::ScanProgress {
                    scan_id: run.scan_id,
                    path: run.root.clone(),
                    status,
                    total_files: run.files.len(),
                    files_scanned,
                    current_file_index: index,
                    corruptions_found: corruptions,
                },
            )
            .await;
    }

    async fn finish_scan(
        &self,
        run: &ScanRun,
        status: ScanStatus,
        index: usize,
        files_scanned: usize,
        corruptions: u32,
    ) {
        if let Err(e) = self.store.update_scan_progress(run.scan_id, index, files_scanned) {
            warn!(scan_id = run.scan_id, error = %e, "failed to persist final progress");
        }
        let completed_at = status.is_terminal().then(|| self.clock.utc_now());
        if let Err(e) = self.store.set_scan_status(run.scan_id, status, completed_at) {
            warn!(scan_id = run.scan_id, error = %e, "failed to persist scan status");
        }
        self.emit_progress(run, status, index, files_scanned, corruptions).await;
        self.active.lock().remove(&run.scan_id);
        info!(scan_id = run.scan_id, %status, files_scanned, corruptions, "scan finished");
    }

    pub(crate) fn scan_path_config(&self, file: &str) -> Result<Option<ScanPath>, EngineError> {
        let now = self.clock.now();
        {
            let cache = self.path_cache.lock();
            if let Some(cached) = cache.as_ref() {
                if now.duration_since(cached.loaded_at) < self.config.path_cache_ttl {
                    return Ok(scan_path::longest_match(&cached.paths, file).cloned());
                }
            }
        }
        let paths = self.store.enabled_scan_paths()?;
        let result = scan_path::longest_match(&paths, file).cloned();
        *self.path_cache.lock() = Some(PathCache { loaded_at: now, paths });
        Ok(result)
    }
}

/// Adapter letting the scheduler trigger scans on the scanner.
pub struct ScanDispatch<C: Clock, D: HealthDetector + 'static>(pub Arc<Scanner<C, D>>);

#[async_trait::async_trait]
impl<C: Clock, D: HealthDetector> crate::scheduler::ScanTrigger for ScanDispatch<C, D> {
    async fn trigger_scan(&self, path_id: i64, local_path: String) {
        if let Err(e) = self.0.scan_path(path_id, &local_path).await {
            warn!(path_id, error = %e, "scheduled scan failed to start");
        }
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
