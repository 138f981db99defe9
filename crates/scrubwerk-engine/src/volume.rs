// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Volume-level operations — bulk deletion and free-space scrubbing.
//
// Whole-volume work is delegated to OS utilities behind the `VolumeTools`
// trait: enumerating every file individually on a full volume is not where
// the value lies, and the platform tools carry OS-specific guarantees the
// engine should not reimplement. The built-in free-space fill (write a
// pattern file until the disk reports full) stays in-process because it is
// plain block I/O.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::process::Command;

use ring::rand::{SecureRandom, SystemRandom};
use scrubwerk_core::OverwritePattern;
use scrubwerk_core::error::{Result, ScrubwerkError};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::overwrite::OverwriteOutcome;

/// Name of the temporary file used to fill unallocated space.
pub const FILL_FILE_NAME: &str = "scrubwerk_fill.bin";

/// Chunk size for the free-space fill loop. Larger than the overwrite block
/// size: here throughput matters and there is no per-file granularity to
/// respect.
const FILL_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Outcome of the external free-space scrub stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubOutcome {
    /// The platform utility ran and reported success.
    Scrubbed,
    /// No scrub utility exists on this system; the certificate must record
    /// degraded confidence.
    Unavailable,
}

/// OS-delegated volume operations.
///
/// A trait seam rather than direct `Command` calls so the engine can be
/// exercised against a mock without shelling out.
pub trait VolumeTools: Send + Sync {
    /// Remove every entry beneath `root` in one delegated operation.
    fn bulk_delete(&self, root: &Path) -> Result<()>;

    /// Run the platform's free-space scrub utility over the volume at
    /// `root`. `Unavailable` means the utility does not exist here; an
    /// invoked-but-failed utility is an error.
    fn scrub_free_space(&self, root: &Path) -> Result<ScrubOutcome>;

    /// Overwrite unallocated space on the volume at `root` with `pattern`.
    /// The default is the built-in fill loop; tests substitute a recorder.
    fn fill_free_space(
        &self,
        root: &Path,
        pattern: OverwritePattern,
        cancel: &CancelToken,
    ) -> Result<OverwriteOutcome> {
        fill_free_space(root, pattern, cancel)
    }
}

/// Production `VolumeTools` backed by platform utilities.
pub struct OsVolumeTools;

impl VolumeTools for OsVolumeTools {
    #[cfg(windows)]
    fn bulk_delete(&self, root: &Path) -> Result<()> {
        let spec = format!("{}\\*.*", root.display());
        let status = Command::new("cmd")
            .args(["/C", "del", "/f", "/s", "/q", &spec])
            .status()
            .map_err(|e| ScrubwerkError::ExternalTool(format!("del spawn failed: {e}")))?;
        if !status.success() {
            return Err(ScrubwerkError::ExternalTool(format!(
                "del exited with {status}"
            )));
        }
        Ok(())
    }

    #[cfg(not(windows))]
    fn bulk_delete(&self, root: &Path) -> Result<()> {
        // Args go straight to find, no shell interpolation.
        let status = Command::new("find")
            .arg(root)
            .args(["-mindepth", "1", "-delete"])
            .status()
            .map_err(|e| ScrubwerkError::ExternalTool(format!("find spawn failed: {e}")))?;
        if !status.success() {
            return Err(ScrubwerkError::ExternalTool(format!(
                "find -delete exited with {status}"
            )));
        }
        Ok(())
    }

    #[cfg(windows)]
    fn scrub_free_space(&self, root: &Path) -> Result<ScrubOutcome> {
        let arg = format!("/w:{}", root.display());
        let spawned = Command::new("cipher").arg(&arg).status();
        match spawned {
            Ok(status) if status.success() => Ok(ScrubOutcome::Scrubbed),
            Ok(status) => Err(ScrubwerkError::ExternalTool(format!(
                "cipher /w exited with {status}"
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ScrubOutcome::Unavailable),
            Err(e) => Err(ScrubwerkError::ExternalTool(format!(
                "cipher spawn failed: {e}"
            ))),
        }
    }

    #[cfg(not(windows))]
    fn scrub_free_space(&self, root: &Path) -> Result<ScrubOutcome> {
        // sfill is part of the secure-delete suite; rarely installed, so
        // absence is the common, non-fatal case.
        let spawned = Command::new("sfill").args(["-l", "-l", "-z"]).arg(root).status();
        match spawned {
            Ok(status) if status.success() => Ok(ScrubOutcome::Scrubbed),
            Ok(status) => Err(ScrubwerkError::ExternalTool(format!(
                "sfill exited with {status}"
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no free-space scrub utility on this system");
                Ok(ScrubOutcome::Unavailable)
            }
            Err(e) => Err(ScrubwerkError::ExternalTool(format!(
                "sfill spawn failed: {e}"
            ))),
        }
    }
}

/// Fill all unallocated space on the volume at `root` by writing `pattern`
/// chunks until the disk reports full.
///
/// The fill file never survives this call — it is removed on completion,
/// cancellation, and error alike.
pub fn fill_free_space(
    root: &Path,
    pattern: OverwritePattern,
    cancel: &CancelToken,
) -> Result<OverwriteOutcome> {
    let fill_path = root.join(FILL_FILE_NAME);
    let result = fill_until_full(&fill_path, pattern, cancel);
    if let Err(e) = fs::remove_file(&fill_path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %fill_path.display(), error = %e, "could not remove fill file");
        }
    }
    result
}

fn fill_until_full(
    path: &Path,
    pattern: OverwritePattern,
    cancel: &CancelToken,
) -> Result<OverwriteOutcome> {
    let mut file = File::create(path)?;
    let rng = SystemRandom::new();
    let mut chunk = vec![0u8; FILL_CHUNK_SIZE];
    if let Some(byte) = pattern.fill_byte() {
        chunk.fill(byte);
    }

    let mut written: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            file.flush()?;
            file.sync_all()?;
            debug!(written, "free-space fill cancelled");
            return Ok(OverwriteOutcome::Cancelled);
        }

        if pattern.fill_byte().is_none() {
            rng.fill(&mut chunk)
                .map_err(|_| io::Error::other("system CSPRNG failure"))?;
        }

        match file.write_all(&chunk) {
            Ok(()) => written += chunk.len() as u64,
            Err(e) if is_disk_full(&e) => {
                // Expected terminal condition: unallocated space is gone.
                let _ = file.flush();
                file.sync_all()?;
                debug!(written, "free space filled");
                return Ok(OverwriteOutcome::Done);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_disk_full(e: &io::Error) -> bool {
    e.kind() == ErrorKind::StorageFull || e.raw_os_error() == Some(28)
}
