// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// EraseEngine — the single-job erase state machine.
//
// One job at a time, by design: destructive work on overlapping paths must
// never interleave. The engine owns a single job slot behind a mutex; a
// dedicated worker thread drives the active job through
// Pending → Running → {Completed, Cancelled, Failed} while API threads read
// snapshots of the same slot. Terminal states are sticky — the only way
// forward from one is a fresh `start`, which replaces the slot.
//
// Lifecycle of a successful job:
//
//   start()            classify, refuse unsafe/missing targets, mint the job
//   worker             overwrite + remove per target kind, progress 0..=100
//   attest             build, canonicalize and sign the certificate
//   store              persist the certificate/signature pair append-only
//   Completed          final slot write; readers now see the terminal state

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use scrubwerk_attest::{
    AttestationSigner, AuditLog, CertificateStore, ScrubConfidence, hash_bytes,
};
use scrubwerk_core::error::{Result, ScrubwerkError};
use scrubwerk_core::types::{
    EraseJob, EraseMethod, EraseTarget, JobId, JobState, OverwritePattern, TargetKind,
};
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::classifier::PathClassifier;
use crate::overwrite::{OverwriteOutcome, overwrite_file};
use crate::volume::{ScrubOutcome, VolumeTools};

// Directory jobs report progress inside a reserved band so the final
// removal and free-space scrub stages always have headroom.
const DIR_BAND_START: u8 = 5;
const DIR_BAND_END: u8 = 95;

// ---------------------------------------------------------------------------
// Job slot
// ---------------------------------------------------------------------------

/// The one mutable cell shared between API threads and the worker.
#[derive(Default)]
struct JobSlot {
    job: Option<EraseJob>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

/// State shared with the worker thread.
struct EngineShared {
    slot: Mutex<JobSlot>,
    signer: Arc<AttestationSigner>,
    store: Arc<CertificateStore>,
    audit: Option<Arc<Mutex<AuditLog>>>,
    tools: Arc<dyn VolumeTools>,
    block_size: usize,
}

/// How a target routine ended, distinct from hard errors.
enum RunOutcome {
    Finished { scrub_confidence: ScrubConfidence },
    Cancelled,
}

/// Result of one directory sweep.
enum Swept {
    Finished,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct EraseEngine {
    classifier: PathClassifier,
    shared: Arc<EngineShared>,
}

impl EraseEngine {
    pub fn new(
        classifier: PathClassifier,
        signer: Arc<AttestationSigner>,
        store: Arc<CertificateStore>,
        audit: Option<Arc<Mutex<AuditLog>>>,
        tools: Arc<dyn VolumeTools>,
        block_size: usize,
    ) -> Self {
        Self {
            classifier,
            shared: Arc::new(EngineShared {
                slot: Mutex::new(JobSlot::default()),
                signer,
                store,
                audit,
                tools,
                block_size,
            }),
        }
    }

    /// Classify `raw_target` and, if it is erasable, launch the worker.
    ///
    /// Refusals (protected path, missing path, a job already running) are
    /// synchronous: no job is minted and nothing on disk changes.
    #[instrument(skip_all, fields(target = %raw_target, method = method.name()))]
    pub fn start(&self, raw_target: &str, method: EraseMethod) -> Result<JobId> {
        let target = match self.classifier.classify(raw_target) {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "target refused");
                audit(&self.shared, "wipe_refused", raw_target, false, Some(&e.to_string()));
                return Err(e);
            }
        };

        let mut slot = lock_slot(&self.shared);
        if slot.job.as_ref().is_some_and(|j| !j.state.is_terminal()) {
            return Err(ScrubwerkError::AlreadyRunning);
        }
        // The previous worker, if any, has made its final slot write by the
        // time its job is terminal; reap the thread before replacing the job.
        if let Some(handle) = slot.worker.take() {
            let _ = handle.join();
        }

        let job = EraseJob::new(target, method);
        let id = job.id;
        let cancel = CancelToken::new();
        slot.job = Some(job.clone());
        slot.cancel = cancel.clone();

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("scrubwerk-erase".into())
            .spawn(move || run_job(shared, job, cancel));
        match spawned {
            Ok(handle) => {
                slot.worker = Some(handle);
                drop(slot);
                info!(job_id = %id, "erase job accepted");
                Ok(id)
            }
            Err(e) => {
                if let Some(job) = slot.job.as_mut() {
                    job.state = JobState::Failed;
                    job.ended_at = Some(Utc::now());
                    job.error = Some(format!("worker thread spawn failed: {e}"));
                }
                Err(ScrubwerkError::Io(e))
            }
        }
    }

    /// Signal the active job to stop at its next checkpoint. Returns `false`
    /// when there is nothing running to cancel.
    pub fn request_cancel(&self) -> bool {
        let signalled = {
            let slot = lock_slot(&self.shared);
            match slot.job.as_ref() {
                Some(job) if !job.state.is_terminal() => {
                    slot.cancel.cancel();
                    Some(job.target.display_path())
                }
                _ => None,
            }
        };
        match signalled {
            Some(target) => {
                info!(%target, "cancellation requested");
                audit(&self.shared, "cancel_requested", &target, true, None);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current job, terminal or not. `None` until the first
    /// `start` succeeds.
    pub fn status(&self) -> Option<EraseJob> {
        lock_slot(&self.shared).job.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock_slot(&self.shared)
            .job
            .as_ref()
            .is_some_and(|j| !j.state.is_terminal())
    }
}

/// Slot access with poison recovery: job state is plain data and must stay
/// readable even if a worker panicked mid-write.
fn lock_slot(shared: &EngineShared) -> MutexGuard<'_, JobSlot> {
    match shared.slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn audit(shared: &EngineShared, action: &str, target: &str, success: bool, details: Option<&str>) {
    if let Some(log) = &shared.audit {
        if let Ok(log) = log.lock() {
            if let Err(e) = log.record(action, target, success, details) {
                warn!(error = %e, "audit write failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Worker entry point. `job` is the immutable descriptor (id, target,
/// method, start time); all mutable state flows through the shared slot.
fn run_job(shared: Arc<EngineShared>, job: EraseJob, cancel: CancelToken) {
    set_state(&shared, JobState::Running);
    let target = job.target.display_path();
    info!(job_id = %job.id, %target, method = job.method.name(), "erase job started");
    audit(&shared, "wipe_start", &target, true, Some(job.method.name()));

    let outcome = match job.target.kind {
        TargetKind::File => erase_file(&shared, &job, &cancel),
        TargetKind::Directory => erase_directory(&shared, &job, &cancel),
        TargetKind::Volume => erase_volume(&shared, &job, &cancel),
    };

    match outcome {
        Ok(RunOutcome::Finished { scrub_confidence }) => {
            // Signing is part of the job: the certificate must exist before
            // anyone can observe Completed.
            let completed_at = Utc::now();
            match attest_and_store(&shared, &job, completed_at, scrub_confidence) {
                Ok(certificate_id) => {
                    finish(&shared, JobState::Completed, None);
                    info!(job_id = %job.id, %certificate_id, "erase job completed");
                    audit(&shared, "wipe_complete", &target, true, Some(&certificate_id));
                }
                Err(e) => {
                    finish(&shared, JobState::Failed, Some(format!("attestation failed: {e}")));
                    error!(job_id = %job.id, error = %e, "attestation failed");
                    audit(&shared, "wipe_failed", &target, false, Some(&e.to_string()));
                }
            }
        }
        Ok(RunOutcome::Cancelled) => {
            finish(&shared, JobState::Cancelled, None);
            warn!(job_id = %job.id, %target, "erase job cancelled");
            audit(&shared, "wipe_cancelled", &target, true, None);
        }
        Err(e) => {
            finish(&shared, JobState::Failed, Some(e.to_string()));
            error!(job_id = %job.id, %target, error = %e, "erase job failed");
            audit(&shared, "wipe_failed", &target, false, Some(&e.to_string()));
        }
    }
}

fn set_state(shared: &EngineShared, state: JobState) {
    if let Some(job) = lock_slot(shared).job.as_mut() {
        job.state = state;
    }
}

/// Monotonic progress update; stale or out-of-order values are dropped.
fn set_progress(shared: &EngineShared, value: u8) {
    if let Some(job) = lock_slot(shared).job.as_mut() {
        if value > job.progress {
            job.progress = value.min(100);
        }
    }
}

/// Final slot write for this job. Completion pins progress to 100; failure
/// and cancellation keep the last value reached.
fn finish(shared: &EngineShared, state: JobState, error_msg: Option<String>) {
    if let Some(job) = lock_slot(shared).job.as_mut() {
        job.state = state;
        job.ended_at = Some(Utc::now());
        job.error = error_msg;
        if state == JobState::Completed {
            job.progress = 100;
        }
    }
}

fn attest_and_store(
    shared: &EngineShared,
    job: &EraseJob,
    completed_at: chrono::DateTime<Utc>,
    scrub_confidence: ScrubConfidence,
) -> Result<String> {
    let (certificate, signature) = shared.signer.attest(job, completed_at, scrub_confidence)?;
    let fingerprint = hash_bytes(&certificate.canonical_bytes()?);
    let id = shared.store.save(&certificate, &signature)?;
    audit(shared, "certificate_issued", &id, true, Some(&fingerprint));
    Ok(id)
}

// ---------------------------------------------------------------------------
// File routine
// ---------------------------------------------------------------------------

/// Overwrite a single file and unlink it. Progress jumps coarsely: 20 when
/// the overwrite begins, 90 when every pass is flushed, 100 once unlinked.
fn erase_file(shared: &EngineShared, job: &EraseJob, cancel: &CancelToken) -> Result<RunOutcome> {
    let path = &job.target.canonical_path;
    set_progress(shared, 20);

    match overwrite_file(path, job.method.pass_sequence(), shared.block_size, cancel)? {
        OverwriteOutcome::Cancelled => return Ok(RunOutcome::Cancelled),
        OverwriteOutcome::Done => {}
    }
    set_progress(shared, 90);

    fs::remove_file(path)?;
    set_progress(shared, 100);
    Ok(RunOutcome::Finished {
        scrub_confidence: ScrubConfidence::Full,
    })
}

// ---------------------------------------------------------------------------
// Directory routine
// ---------------------------------------------------------------------------

/// Post-order sweep: overwrite and unlink files, remove directories
/// bottom-up, then the root itself. Per-file progress is scaled into
/// [DIR_BAND_START, DIR_BAND_END]; the secure method appends a free-space
/// scrub of the host volume before the job reaches 100.
fn erase_directory(
    shared: &EngineShared,
    job: &EraseJob,
    cancel: &CancelToken,
) -> Result<RunOutcome> {
    let root = &job.target.canonical_path;
    let total = count_files(root).max(1);
    set_progress(shared, DIR_BAND_START);

    let mut done = 0usize;
    match sweep_tree(shared, job, root, &mut done, total, cancel)? {
        Swept::Cancelled => return Ok(RunOutcome::Cancelled),
        Swept::Finished => {}
    }

    if let Err(e) = fs::remove_dir(root) {
        // Skipped files or late arrivals leave residue behind; one recursive
        // removal settles it or fails the job honestly.
        debug!(error = %e, "root not empty after sweep, removing recursively");
        fs::remove_dir_all(root)?;
    }
    set_progress(shared, DIR_BAND_END);

    let scrub_confidence = if job.method == EraseMethod::Secure {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }
        let host = root.parent().unwrap_or(root);
        match shared.tools.scrub_free_space(host)? {
            ScrubOutcome::Scrubbed => ScrubConfidence::Full,
            ScrubOutcome::Unavailable => {
                warn!("no free-space scrub utility on this system");
                ScrubConfidence::Degraded
            }
        }
    } else {
        ScrubConfidence::Full
    };

    set_progress(shared, 100);
    Ok(RunOutcome::Finished { scrub_confidence })
}

/// Count regular files (and symlinks, which are unlinked not followed) so
/// sweep progress has a denominator. Unreadable corners are skipped; the
/// count only feeds the progress figure.
fn count_files(dir: &Path) -> usize {
    let mut count = 0;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return count,
    };
    for entry in entries.flatten() {
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => count += count_files(&entry.path()),
            Ok(_) => count += 1,
            Err(_) => count += 1,
        }
    }
    count
}

fn sweep_tree(
    shared: &EngineShared,
    job: &EraseJob,
    dir: &Path,
    done: &mut usize,
    total: usize,
    cancel: &CancelToken,
) -> Result<Swept> {
    if cancel.is_cancelled() {
        return Ok(Swept::Cancelled);
    }

    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_dir() {
            subdirs.push(entry.path());
        } else {
            // Symlinks land here: they are unlinked below without ever
            // opening the link target.
            files.push((entry.path(), ft.is_symlink()));
        }
    }

    for sub in subdirs {
        match sweep_tree(shared, job, &sub, done, total, cancel)? {
            Swept::Cancelled => return Ok(Swept::Cancelled),
            Swept::Finished => {}
        }
        if let Err(e) = fs::remove_dir(&sub) {
            warn!(dir = %sub.display(), error = %e, "subdirectory not empty after sweep");
        }
    }

    for (file, is_symlink) in files {
        if cancel.is_cancelled() {
            return Ok(Swept::Cancelled);
        }
        if is_symlink {
            if let Err(e) = fs::remove_file(&file) {
                warn!(file = %file.display(), error = %e, "skipping: could not remove symlink");
            }
        } else {
            match overwrite_file(&file, job.method.pass_sequence(), shared.block_size, cancel) {
                Ok(OverwriteOutcome::Cancelled) => return Ok(Swept::Cancelled),
                Ok(OverwriteOutcome::Done) => {
                    if let Err(e) = fs::remove_file(&file) {
                        warn!(file = %file.display(), error = %e, "skipping: could not remove file");
                    }
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping: could not overwrite file");
                }
            }
        }
        *done += 1;
        let span = u64::from(DIR_BAND_END - DIR_BAND_START);
        let scaled = (*done as u64 * span) / total as u64;
        set_progress(shared, DIR_BAND_START + scaled as u8);
    }

    Ok(Swept::Finished)
}

// ---------------------------------------------------------------------------
// Volume routine
// ---------------------------------------------------------------------------

/// Whole-volume erase: delegated bulk delete, directory-skeleton cleanup,
/// built-in free-space fill, then the external scrub utility. Progress moves
/// through fixed checkpoints (10, 40, 55, 90, 95, 100).
fn erase_volume(shared: &EngineShared, job: &EraseJob, cancel: &CancelToken) -> Result<RunOutcome> {
    let root = volume_root_path(&job.target);
    set_progress(shared, 10);
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    shared.tools.bulk_delete(&root)?;
    set_progress(shared, 40);
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    // The delegated delete removes files; empty directory skeletons remain.
    cleanup_directories(&root);
    set_progress(shared, 55);
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    // One fill pass with the method's final pattern. The multi-pass sequence
    // applies to per-file overwrites; free space gets a single saturating
    // write.
    let pattern = match job.method {
        EraseMethod::Quick => OverwritePattern::Zeroes,
        EraseMethod::Secure => OverwritePattern::Random,
    };
    match shared.tools.fill_free_space(&root, pattern, cancel)? {
        OverwriteOutcome::Cancelled => return Ok(RunOutcome::Cancelled),
        OverwriteOutcome::Done => {}
    }
    set_progress(shared, 90);
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    let scrub_confidence = match shared.tools.scrub_free_space(&root)? {
        ScrubOutcome::Scrubbed => ScrubConfidence::Full,
        ScrubOutcome::Unavailable => {
            warn!("no free-space scrub utility on this system");
            ScrubConfidence::Degraded
        }
    };
    set_progress(shared, 95);

    set_progress(shared, 100);
    Ok(RunOutcome::Finished { scrub_confidence })
}

/// A bare drive identifier like `d:` is cwd-relative on Windows; append the
/// separator so every tool sees the volume root.
fn volume_root_path(target: &EraseTarget) -> PathBuf {
    if cfg!(windows) {
        let mut spec = target.canonical_path.to_string_lossy().into_owned();
        spec.push('\\');
        PathBuf::from(spec)
    } else {
        target.canonical_path.clone()
    }
}

/// Remove leftover directory trees under the volume root, best effort.
fn cleanup_directories(root: &Path) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "directory cleanup skipped");
            return;
        }
    };
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        if is_dir {
            if let Err(e) = fs::remove_dir_all(entry.path()) {
                warn!(dir = %entry.path().display(), error = %e, "leftover directory not removed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
