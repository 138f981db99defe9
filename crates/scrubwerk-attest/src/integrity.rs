// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact integrity — SHA-256 fingerprints for certificates and audit rows.

use scrubwerk_core::error::ScrubwerkError;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Used to fingerprint canonical certificate bytes in audit entries and API
/// responses, so an operator can spot a swapped artifact at a glance without
/// running full signature verification.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Verify that `data` matches the expected SHA-256 hex digest.
///
/// Returns `Ok(())` when the hash matches, or
/// `Err(ScrubwerkError::IntegrityMismatch)` with the expected and actual
/// values when it does not.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), ScrubwerkError> {
    let actual = hash_bytes(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(ScrubwerkError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}
