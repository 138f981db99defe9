// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attestation signing — long-lived Ed25519 key pair for erasure certificates.
//
// # Design note
//
// Ed25519 (RFC 8032) is deliberately chosen over ECDSA here: its signatures
// are deterministic, so the same canonical certificate bytes always produce
// the same signature and a faulty random-nonce source can never weaken the
// key. `ring` derives the nonce from the message and private key; no RNG is
// involved after key generation.
//
// The private key lives in one PKCS#8 v2 document on disk, generated on
// first start and loaded verbatim afterwards — never regenerated while the
// file exists, since every previously issued certificate verifies against
// this one public key.

use std::fs;
use std::path::Path;

use ring::rand::SystemRandom;
use ring::signature::{ED25519, Ed25519KeyPair, KeyPair, UnparsedPublicKey};
use scrubwerk_core::error::{Result, ScrubwerkError};
use scrubwerk_core::EraseJob;
use tracing::{debug, info, instrument};

use crate::certificate::{Certificate, ScrubConfidence};
use crate::identity;

/// A detached Ed25519 signature over canonical certificate bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering, for API responses and logs.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// The process's long-lived certificate-signing identity.
///
/// Loaded once at startup and shared read-only for the process lifetime.
pub struct AttestationSigner {
    key_pair: Ed25519KeyPair,
    /// Raw 32-byte Ed25519 public key.
    public_key: Vec<u8>,
}

impl AttestationSigner {
    /// Load the signing key from `key_path`, generating and persisting a
    /// fresh one only if no key file exists yet.
    #[instrument(skip_all, fields(path = %key_path.display()))]
    pub fn load_or_generate(key_path: &Path) -> Result<Self> {
        if key_path.exists() {
            let pkcs8 = fs::read(key_path)?;
            let signer = Self::from_pkcs8(&pkcs8)?;
            debug!(pubkey = %signer.public_key_hex(), "signing key loaded");
            return Ok(signer);
        }

        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|e| ScrubwerkError::Signing(format!("key generation failed: {e}")))?;
        fs::write(key_path, pkcs8.as_ref())?;

        let signer = Self::from_pkcs8(pkcs8.as_ref())?;
        info!(pubkey = %signer.public_key_hex(), "new signing key generated");
        Ok(signer)
    }

    /// Parse a PKCS#8 v2 Ed25519 document (as produced by `generate_pkcs8`).
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8)
            .map_err(|e| ScrubwerkError::Signing(format!("key parsing failed: {e}")))?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Self {
            key_pair,
            public_key,
        })
    }

    /// Raw 32-byte Ed25519 public key.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Lowercase hex form of the public key, the exportable verifier handle.
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    /// Sign the canonical bytes of `certificate`.
    pub fn sign_certificate(&self, certificate: &Certificate) -> Result<Signature> {
        let canonical = certificate.canonical_bytes()?;
        let sig = self.key_pair.sign(&canonical);
        Ok(Signature(sig.as_ref().to_vec()))
    }

    /// Build and sign the certificate for a job that reached completion.
    ///
    /// The subject and network identity are resolved at signing time, not
    /// cached — the machine's address may legitimately change between boots.
    #[instrument(skip_all, fields(job_id = %job.id, target = %job.target.display_path()))]
    pub fn attest(
        &self,
        job: &EraseJob,
        completed_at: chrono::DateTime<chrono::Utc>,
        scrub_confidence: ScrubConfidence,
    ) -> Result<(Certificate, Signature)> {
        let subject = identity::operator_identity();
        let network = identity::network_identity();
        let certificate =
            Certificate::from_job(job, completed_at, &subject, &network, scrub_confidence);
        let signature = self.sign_certificate(&certificate)?;
        debug!(
            certificate_id = %certificate.certificate_id,
            signature = %signature.to_hex(),
            "certificate signed"
        );
        Ok((certificate, signature))
    }
}

/// Verify a detached signature against certificate bytes and a raw Ed25519
/// public key. Any third party holding the exported public key can run the
/// same check.
pub fn verify_detached(public_key: &[u8], certificate_bytes: &[u8], signature: &[u8]) -> Result<()> {
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(certificate_bytes, signature)
        .map_err(|_| ScrubwerkError::Signing("signature verification failed".to_string()))
}
