// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Erasure certificates — the immutable record of a completed erase job.
//
// Verification must reproduce the exact signed bytes, so certificates are
// serialized through RFC 8785 (JCS) canonical JSON: sorted keys, fixed
// number/string forms, no whitespace. The same certificate value always
// canonicalizes to the same byte sequence.

use chrono::{DateTime, Utc};
use scrubwerk_core::error::{Result, ScrubwerkError};
use scrubwerk_core::{EraseJob, EraseMethod};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much assurance the free-space scrub stage actually delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrubConfidence {
    /// Every planned stage ran, including the external scrub utility where
    /// the target kind calls for one.
    Full,
    /// The wipe completed but the external scrub utility was unavailable on
    /// this system; remnant recovery from unallocated space is harder to
    /// rule out.
    Degraded,
}

/// Immutable record of a completed erase job.
///
/// Produced exactly once per job that reached `Completed`; never mutated
/// after creation. The detached signature is kept outside this body so the
/// signed byte sequence stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Random, unguessable, fixed-width identifier (UUID v4).
    pub certificate_id: String,
    /// Operator and machine identity, `operator@machine`.
    pub subject: String,
    /// Canonical path of the erased target.
    pub target_device: String,
    pub method: EraseMethod,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    /// Best-effort local network address at signing time.
    pub issuer_network_identity: String,
    pub scrub_confidence: ScrubConfidence,
}

impl Certificate {
    /// Build the certificate for a job that reached completion.
    pub fn from_job(
        job: &EraseJob,
        completed_at: DateTime<Utc>,
        subject: &str,
        network_identity: &str,
        scrub_confidence: ScrubConfidence,
    ) -> Self {
        let duration_seconds = (completed_at - job.started_at).num_seconds().max(0) as u64;
        Self {
            certificate_id: Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            target_device: job.target.display_path(),
            method: job.method,
            started_at: job.started_at,
            completed_at,
            duration_seconds,
            issuer_network_identity: network_identity.to_string(),
            scrub_confidence,
        }
    }

    /// Canonical (RFC 8785) byte encoding — the exact bytes that get signed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        serde_jcs::to_vec(self)
            .map_err(|e| ScrubwerkError::Certificate(format!("canonicalization failed: {e}")))
    }
}
