// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Return the agent data directory, creating it if needed.
///
/// Holds the config file, signing key, certificate store, and audit
/// database. `SCRUBWERK_DATA` overrides the conventional location, which
/// test fixtures and packaged deployments both rely on.
pub fn data_dir() -> PathBuf {
    let base = dirs_fallback();
    let dir = base.join("scrubwerk");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn dirs_fallback() -> PathBuf {
    if let Ok(explicit) = std::env::var("SCRUBWERK_DATA") {
        return PathBuf::from(explicit);
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}
