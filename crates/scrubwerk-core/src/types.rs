// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scrubwerk secure-erase agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for an erase job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a classified target refers to on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// A whole mounted volume (drive letter or mount point).
    Volume,
    /// A directory tree.
    Directory,
    /// A single regular file.
    File,
}

/// A classified, safety-checked erase target.
///
/// Produced only by the path classifier; immutable once constructed. The
/// `canonical_path` is absolute with symlinks resolved (volume identifiers
/// are kept in their normalized short form, e.g. `d:`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseTarget {
    pub kind: TargetKind,
    pub canonical_path: PathBuf,
    /// Whether the deny-list and volume-root exclusions were applied and
    /// passed. Always true for classifier-produced values.
    pub is_safe: bool,
}

impl EraseTarget {
    /// Lossy display form of the canonical path, for logs and certificates.
    pub fn display_path(&self) -> String {
        self.canonical_path.to_string_lossy().into_owned()
    }
}

/// A named overwrite bit pattern for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverwritePattern {
    /// 0x00 fill.
    Zeroes,
    /// 0xFF fill.
    Ones,
    /// 0xAA fill (alternating bits).
    Alternating,
    /// Cryptographically random bytes, fresh per block.
    Random,
}

impl OverwritePattern {
    /// The fixed fill byte for deterministic patterns, `None` for random.
    pub fn fill_byte(&self) -> Option<u8> {
        match self {
            Self::Zeroes => Some(0x00),
            Self::Ones => Some(0xFF),
            Self::Alternating => Some(0xAA),
            Self::Random => None,
        }
    }
}

/// How thoroughly content is destroyed before removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraseMethod {
    /// Structural deletion only, no content overwrite.
    Quick,
    /// Multi-pass overwrite (zeroes, ones, alternating, random) before deletion.
    Secure,
}

impl EraseMethod {
    /// Ordered overwrite passes applied to file content before removal.
    pub fn pass_sequence(&self) -> &'static [OverwritePattern] {
        match self {
            Self::Quick => &[],
            Self::Secure => &[
                OverwritePattern::Zeroes,
                OverwritePattern::Ones,
                OverwritePattern::Alternating,
                OverwritePattern::Random,
            ],
        }
    }

    /// Lowercase wire name, as used in requests and certificates.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Secure => "secure",
        }
    }

    /// Parse a wire name; unknown names are rejected, not defaulted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quick" => Some(Self::Quick),
            "secure" => Some(Self::Secure),
            _ => None,
        }
    }
}

/// Lifecycle states of an erase job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, worker not yet running.
    Pending,
    /// Worker is erasing (or signing the certificate).
    Running,
    /// Stopped at a cancellation check point; partial progress remains.
    Cancelled,
    /// Aborted — see job error field.
    Failed,
    /// All stages finished and the certificate was issued.
    Completed,
}

impl JobState {
    /// Terminal states are sticky; only a brand-new job supersedes them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed | Self::Completed)
    }
}

/// The unit of work: one erase operation against one target.
///
/// Owned exclusively by the engine; everything here is plain data so status
/// readers get a cheap snapshot clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraseJob {
    pub id: JobId,
    pub target: EraseTarget,
    pub method: EraseMethod,
    pub state: JobState,
    /// 0–100, monotonically non-decreasing for the lifetime of the job.
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl EraseJob {
    pub fn new(target: EraseTarget, method: EraseMethod) -> Self {
        Self {
            id: JobId::new(),
            target,
            method,
            state: JobState::Pending,
            progress: 0,
            started_at: Utc::now(),
            ended_at: None,
            error: None,
        }
    }
}

/// A mounted volume visible to the agent, for device listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInfo {
    /// Backing device (e.g. `/dev/sdb1`) or drive letter.
    pub device: String,
    /// Where the volume is mounted.
    #[serde(rename = "mount")]
    pub mount_point: String,
}
