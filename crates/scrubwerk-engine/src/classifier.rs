// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Path classification — turning raw operator input into a safety-checked,
// canonical erase target.
//
// Classification is the last gate before irreversible destruction, so the
// deny-list check runs twice: once against the absolutized input (catching
// protected roots even when the path does not exist) and again after
// symlink resolution (a link pointing into a protected root must not slip
// through). All comparisons are case-folded for case-insensitive
// filesystems.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use scrubwerk_core::error::{Result, ScrubwerkError};
use scrubwerk_core::{EraseTarget, TargetKind};
use tracing::{debug, instrument};

/// Protected roots that can never be erased, nor anything beneath them.
/// Windows and unix layouts are both listed; entries absent on the running
/// system simply never match.
const BUILTIN_DENY_ROOTS: &[&str] = &[
    // Windows
    "c:\\windows",
    "c:\\program files",
    "c:\\program files (x86)",
    "c:\\programdata",
    "c:\\users",
    "c:\\$recycle.bin",
    // Unix
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/lib64",
    "/opt",
    "/proc",
    "/root",
    "/run",
    "/sbin",
    "/sys",
    "/usr",
    "/var",
];

/// Volume identifiers that are refused outright: wiping the volume the
/// operating system runs from is never a remote-agent operation.
const SYSTEM_VOLUME_ROOTS: &[&str] = &["c:"];

/// Classifies raw target strings into `EraseTarget`s, applying the
/// deny-list and volume-root exclusions before any result is trusted.
pub struct PathClassifier {
    /// Lowercased, separator-trimmed deny roots: built-ins plus any
    /// configured extras (the agent adds its own data directory here so the
    /// signing key can never be selected for erasure).
    deny_roots: Vec<String>,
}

impl PathClassifier {
    pub fn new(extra_roots: &[PathBuf]) -> Self {
        let mut deny_roots: Vec<String> = BUILTIN_DENY_ROOTS
            .iter()
            .map(|r| r.to_string())
            .collect();
        for extra in extra_roots {
            let folded = fold_path(extra);
            if !folded.is_empty() {
                deny_roots.push(folded);
            }
        }
        Self { deny_roots }
    }

    /// Classify `raw` into a volume, directory, or file target.
    ///
    /// A 2–3 character string containing `:` is always treated as a volume
    /// identifier, even if a same-named file exists — volume wipes are the
    /// highest-blast-radius operation and must be unambiguous from the
    /// shortest possible input.
    #[instrument(skip_all, fields(raw = %raw))]
    pub fn classify(&self, raw: &str) -> Result<EraseTarget> {
        let cleaned = raw.trim().trim_matches(['"', '\'']).trim();
        if cleaned.is_empty() {
            return Err(ScrubwerkError::TargetNotFound("empty target".to_string()));
        }

        if cleaned.len() <= 3 && cleaned.contains(':') {
            return self.classify_volume(cleaned);
        }

        // Deny check on the absolutized input, before touching the
        // filesystem at all.
        let absolute = std::path::absolute(cleaned)?;
        self.check_safety(&absolute)?;

        let canonical = match fs::canonicalize(&absolute) {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ScrubwerkError::TargetNotFound(cleaned.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        // Re-check with symlinks resolved.
        self.check_safety(&canonical)?;

        let metadata = fs::metadata(&canonical)?;
        let kind = if metadata.is_dir() {
            TargetKind::Directory
        } else if metadata.is_file() {
            TargetKind::File
        } else {
            // Device nodes, sockets, pipes: not erasable content.
            return Err(ScrubwerkError::TargetNotFound(format!(
                "{cleaned} is not a regular file or directory"
            )));
        };

        debug!(kind = ?kind, canonical = %canonical.display(), "target classified");
        Ok(EraseTarget {
            kind,
            canonical_path: canonical,
            is_safe: true,
        })
    }

    fn classify_volume(&self, cleaned: &str) -> Result<EraseTarget> {
        let normalized = cleaned
            .trim_end_matches(['\\', '/'])
            .to_ascii_lowercase();

        let shape_ok = normalized.len() == 2
            && normalized.as_bytes()[0].is_ascii_alphabetic()
            && normalized.as_bytes()[1] == b':';
        if !shape_ok {
            return Err(ScrubwerkError::TargetNotFound(format!(
                "{cleaned} is not a volume identifier"
            )));
        }

        // Same deny gate as path targets: catches the system volume and
        // any configured protected root that names a bare drive.
        self.check_safety(Path::new(&normalized))?;

        debug!(volume = %normalized, "target classified as volume");
        Ok(EraseTarget {
            kind: TargetKind::Volume,
            canonical_path: PathBuf::from(normalized),
            is_safe: true,
        })
    }

    /// Reject `path` if it is a blocked volume root, a protected root, or a
    /// descendant of one.
    fn check_safety(&self, path: &Path) -> Result<()> {
        let folded = fold_path(path);

        // The bare filesystem root folds to "".
        if folded.is_empty() {
            return Err(ScrubwerkError::UnsafeTarget(
                "refusing the filesystem root".to_string(),
            ));
        }
        if SYSTEM_VOLUME_ROOTS.contains(&folded.as_str()) {
            return Err(ScrubwerkError::UnsafeTarget(format!(
                "{folded} is the system volume"
            )));
        }

        for root in &self.deny_roots {
            if is_same_or_descendant(&folded, root) {
                return Err(ScrubwerkError::UnsafeTarget(format!(
                    "{} is under protected root {root}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Case-fold a path to its comparison form: lowercase, trailing separators
/// trimmed.
fn fold_path(path: &Path) -> String {
    path.to_string_lossy()
        .to_lowercase()
        .trim_end_matches(['/', '\\'])
        .to_string()
}

/// Prefix match with separator awareness: `/etc` matches `/etc` and
/// `/etc/passwd` but not `/etcetera`.
fn is_same_or_descendant(path: &str, root: &str) -> bool {
    if path == root {
        return true;
    }
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('\\'))
}
