// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scrubwerk-attest — Tamper-evident attestation for completed erase jobs.
//
// This crate turns a finished erase job into a verifiable record: a
// canonical certificate, a detached Ed25519 signature over its exact bytes,
// an append-only store for the pair, and the audit trail that records every
// security-relevant step along the way.

pub mod audit;
pub mod certificate;
pub mod identity;
pub mod integrity;
pub mod signer;
pub mod store;

pub use audit::AuditLog;
pub use certificate::{Certificate, ScrubConfidence};
pub use integrity::{hash_bytes, verify_hash};
pub use signer::{AttestationSigner, Signature, verify_detached};
pub use store::CertificateStore;
