// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate store — append-only directory of certificate/signature pairs.
//
// Layout: one `{certificate_id}.json` holding the canonical certificate
// bytes and one `{certificate_id}.sig` holding the raw detached signature.
// Companions share the base identifier so a verifier can fetch both with
// one key. Nothing in here is ever overwritten or deleted.

use std::fs;
use std::path::PathBuf;

use scrubwerk_core::error::{Result, ScrubwerkError};
use tracing::{debug, instrument};

use crate::certificate::Certificate;
use crate::signer::Signature;

/// Append-only store for signed erasure certificates.
pub struct CertificateStore {
    root: PathBuf,
}

impl CertificateStore {
    /// Open (or create) the certificate directory at `root`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        debug!("certificate store opened");
        Ok(Self { root })
    }

    /// Persist a certificate and its detached signature; returns the
    /// certificate id the pair is addressable by.
    ///
    /// Saving is strictly append-only: an id that already has artifacts on
    /// disk is refused, never replaced.
    #[instrument(skip_all, fields(certificate_id = %certificate.certificate_id))]
    pub fn save(&self, certificate: &Certificate, signature: &Signature) -> Result<String> {
        let id = certificate.certificate_id.clone();
        let (cert_path, sig_path) = self.artifact_paths(&id)?;

        if cert_path.exists() || sig_path.exists() {
            return Err(ScrubwerkError::Certificate(format!(
                "certificate {id} already exists; store is append-only"
            )));
        }

        fs::write(&cert_path, certificate.canonical_bytes()?)?;
        fs::write(&sig_path, signature.as_bytes())?;

        debug!("certificate pair stored");
        Ok(id)
    }

    /// Load the canonical certificate bytes and signature bytes for `id`.
    ///
    /// Returns `Ok(None)` when no certificate with that id exists. A
    /// certificate whose signature companion is missing is reported as an
    /// error — that is a corrupted store, not an absent entry.
    pub fn load(&self, id: &str) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let (cert_path, sig_path) = self.artifact_paths(id)?;

        if !cert_path.exists() {
            return Ok(None);
        }
        if !sig_path.exists() {
            return Err(ScrubwerkError::Certificate(format!(
                "certificate {id} has no signature companion"
            )));
        }

        let cert_bytes = fs::read(&cert_path)?;
        let sig_bytes = fs::read(&sig_path)?;
        Ok(Some((cert_bytes, sig_bytes)))
    }

    /// All stored certificate ids, sorted ascending.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Resolve the companion file paths for `id`, rejecting anything that
    /// could escape the store directory. Ids are UUID-shaped, so only
    /// lowercase hex and hyphens are legitimate.
    fn artifact_paths(&self, id: &str) -> Result<(PathBuf, PathBuf)> {
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid {
            return Err(ScrubwerkError::Certificate(format!(
                "invalid certificate id: {id:?}"
            )));
        }
        Ok((
            self.root.join(format!("{id}.json")),
            self.root.join(format!("{id}.sig")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::ScrubConfidence;
    use crate::signer::AttestationSigner;
    use chrono::Utc;
    use ring::rand::SystemRandom;
    use ring::signature::Ed25519KeyPair;
    use scrubwerk_core::{EraseJob, EraseMethod, EraseTarget, TargetKind};

    fn signed_pair() -> (Certificate, Signature, AttestationSigner) {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("generate pkcs8");
        let signer = AttestationSigner::from_pkcs8(pkcs8.as_ref()).expect("parse pkcs8");
        let job = EraseJob::new(
            EraseTarget {
                kind: TargetKind::File,
                canonical_path: "/tmp/scrubwerk-test/stored.bin".into(),
                is_safe: true,
            },
            EraseMethod::Quick,
        );
        let (certificate, signature) = signer
            .attest(&job, Utc::now(), ScrubConfidence::Full)
            .expect("attest");
        (certificate, signature, signer)
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CertificateStore::open(dir.path().to_path_buf()).expect("open");
        let (certificate, signature, signer) = signed_pair();

        let id = store.save(&certificate, &signature).expect("save");
        assert_eq!(id, certificate.certificate_id);

        let (cert_bytes, sig_bytes) = store
            .load(&id)
            .expect("load")
            .expect("certificate must exist");
        assert_eq!(cert_bytes, certificate.canonical_bytes().expect("canonicalize"));
        assert_eq!(sig_bytes, signature.as_bytes());

        // The stored pair verifies as-is, with no re-serialization step.
        crate::signer::verify_detached(signer.public_key(), &cert_bytes, &sig_bytes)
            .expect("stored pair must verify");
    }

    #[test]
    fn save_refuses_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CertificateStore::open(dir.path().to_path_buf()).expect("open");
        let (certificate, signature, _) = signed_pair();

        store.save(&certificate, &signature).expect("first save");
        let second = store.save(&certificate, &signature);
        assert!(second.is_err(), "store must be append-only");
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CertificateStore::open(dir.path().to_path_buf()).expect("open");
        let loaded = store
            .load("00000000-0000-4000-8000-000000000000")
            .expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn rejects_path_traversal_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CertificateStore::open(dir.path().to_path_buf()).expect("open");

        for bad in ["../escape", "a/b", "", "id with space", "..\\win"] {
            assert!(store.load(bad).is_err(), "id {bad:?} must be rejected");
        }
    }

    #[test]
    fn list_returns_sorted_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CertificateStore::open(dir.path().to_path_buf()).expect("open");

        let mut expected = Vec::new();
        for _ in 0..3 {
            let (certificate, signature, _) = signed_pair();
            expected.push(store.save(&certificate, &signature).expect("save"));
        }
        expected.sort();

        assert_eq!(store.list().expect("list"), expected);
    }
}
