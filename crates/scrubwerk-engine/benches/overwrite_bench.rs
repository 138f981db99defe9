// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the overwrite primitive and the path classifier
// in the scrubwerk-engine crate.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use scrubwerk_core::types::{EraseMethod, OverwritePattern};
use scrubwerk_engine::overwrite::{DEFAULT_BLOCK_SIZE, overwrite};
use scrubwerk_engine::{CancelToken, PathClassifier};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark the full secure pass sequence (zeroes, ones, alternating,
/// random) against an in-memory sink at two payload sizes.
fn bench_secure_pass_sequence(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[("64 KiB", 64 * 1024), ("1 MiB", 1024 * 1024)];
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("secure_pass_sequence");
    for &(label, size) in sizes {
        group.bench_function(label, |b| {
            let mut sink = Cursor::new(vec![0u8; size]);
            b.iter(|| {
                let outcome = overwrite(
                    &mut sink,
                    size as u64,
                    black_box(EraseMethod::Secure.pass_sequence()),
                    DEFAULT_BLOCK_SIZE,
                    &cancel,
                )
                .expect("overwrite failed");
                black_box(outcome);
            });
        });
    }
    group.finish();
}

/// Benchmark one pass per pattern over 256 KiB. Shows the fixed-fill cost
/// against the per-block CSPRNG cost of the random pattern.
fn bench_single_pattern_pass(c: &mut Criterion) {
    let patterns: &[(&str, OverwritePattern)] = &[
        ("zeroes", OverwritePattern::Zeroes),
        ("ones", OverwritePattern::Ones),
        ("alternating", OverwritePattern::Alternating),
        ("random", OverwritePattern::Random),
    ];
    let size = 256 * 1024;
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("single_pattern_pass (256 KiB)");
    for &(label, pattern) in patterns {
        group.bench_function(label, |b| {
            let mut sink = Cursor::new(vec![0u8; size]);
            b.iter(|| {
                let outcome = overwrite(
                    &mut sink,
                    size as u64,
                    black_box(&[pattern]),
                    DEFAULT_BLOCK_SIZE,
                    &cancel,
                )
                .expect("overwrite failed");
                black_box(outcome);
            });
        });
    }
    group.finish();
}

/// Benchmark classifier refusals. Both inputs are rejected before any
/// filesystem call, so this measures the pure path-folding cost that sits
/// on every request.
fn bench_classifier_refusal(c: &mut Criterion) {
    let classifier = PathClassifier::new(&[]);
    let inputs: &[(&str, &str)] = &[
        ("deny_root", "/etc/passwd"),
        ("system_volume", "c:\\"),
    ];

    let mut group = c.benchmark_group("classifier_refusal");
    for &(label, input) in inputs {
        group.bench_function(label, |b| {
            b.iter(|| {
                let result = classifier.classify(black_box(input));
                black_box(result.is_err());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_secure_pass_sequence,
    bench_single_pattern_pass,
    bench_classifier_refusal,
);
criterion_main!(benches);
