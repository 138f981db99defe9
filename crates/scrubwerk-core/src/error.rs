// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scrubwerk.

use thiserror::Error;

/// Top-level error type for all Scrubwerk operations.
#[derive(Debug, Error)]
pub enum ScrubwerkError {
    // -- Classification errors --
    #[error("refusing protected target: {0}")]
    UnsafeTarget(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    // -- Engine errors --
    #[error("an erase job is already running")]
    AlreadyRunning,

    #[error("external tool failed: {0}")]
    ExternalTool(String),

    // -- Attestation errors --
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScrubwerkError>;
