// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for certificate signing, integrity hashing, and audit
// logging in the scrubwerk-attest crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use ring::rand::SystemRandom;
use ring::signature::Ed25519KeyPair;
use scrubwerk_attest::certificate::ScrubConfidence;
use scrubwerk_attest::{AttestationSigner, AuditLog, hash_bytes};
use scrubwerk_core::{EraseJob, EraseMethod, EraseTarget, TargetKind};

fn bench_signer() -> AttestationSigner {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).expect("generate pkcs8");
    AttestationSigner::from_pkcs8(pkcs8.as_ref()).expect("parse pkcs8")
}

fn bench_job() -> EraseJob {
    EraseJob::new(
        EraseTarget {
            kind: TargetKind::Directory,
            canonical_path: "/tmp/scrubwerk-bench/tree".into(),
            is_safe: true,
        },
        EraseMethod::Secure,
    )
}

/// Benchmark a full attest cycle: certificate construction, canonical JSON
/// serialization, and one Ed25519 signature.
///
/// This is the synchronous tail of every completed job, so its latency is
/// directly visible to status pollers.
fn bench_attest(c: &mut Criterion) {
    let signer = bench_signer();
    let job = bench_job();

    c.bench_function("attest (build + canonicalize + sign)", |b| {
        b.iter(|| {
            let (certificate, signature) = signer
                .attest(black_box(&job), Utc::now(), ScrubConfidence::Full)
                .expect("attest failed");
            black_box((certificate, signature));
        });
    });
}

/// Benchmark SHA-256 fingerprinting at certificate-like sizes.
fn bench_fingerprint(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[("512 B", 512), ("4 KiB", 4 * 1024), ("64 KiB", 64 * 1024)];

    let mut group = c.benchmark_group("fingerprint_sha256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| {
                let hex = hash_bytes(black_box(&data));
                black_box(hex);
            });
        });
    }
    group.finish();
}

/// Benchmark recording an audit entry to an in-memory SQLite database.
fn bench_audit_record(c: &mut Criterion) {
    c.bench_function("audit_record (in-memory SQLite)", |b| {
        // Create the database once outside the hot loop so we measure
        // steady-state insertion, not schema creation.
        let log = AuditLog::open_in_memory().expect("open in-memory audit log");

        b.iter(|| {
            log.record(
                black_box("wipe_complete"),
                black_box("/tmp/scrubwerk-bench/tree"),
                black_box(true),
                black_box(Some("benchmark test entry")),
            )
            .expect("record failed");
        });
    });
}

criterion_group!(benches, bench_attest, bench_fingerprint, bench_audit_record);
criterion_main!(benches);
