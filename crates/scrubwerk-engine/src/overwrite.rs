// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-pass overwrite primitive.
//
// Content destruction happens here: for each pattern in the method's pass
// sequence the sink is rewound and rewritten block by block, and every pass
// is made durable (flush + sync) before the next begins. A crash mid-
// sequence therefore leaves the disk consistent with some completed pass,
// never a half-written block spanning old and new data.
//
// Random passes draw fresh bytes from the OS CSPRNG per block; reusing one
// random block across the whole file would make the "random" layer
// predictable.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use ring::rand::{SecureRandom, SystemRandom};
use scrubwerk_core::OverwritePattern;

use crate::cancel::CancelToken;

/// Default overwrite block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// How an overwrite call ended.
///
/// Cancellation is distinguished from success so the caller never proceeds
/// to delete or finalize a target whose passes were cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteOutcome {
    /// Every requested pass completed and was synced.
    Done,
    /// A cancellation signal was observed at a block boundary; whatever was
    /// written so far has been flushed.
    Cancelled,
}

/// A writable, seekable byte sink whose buffered data can be forced to
/// durable storage.
pub trait OverwriteSink: Write + Seek {
    fn sync(&mut self) -> io::Result<()>;
}

impl OverwriteSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// In-memory sinks have no durability step; used by tests.
impl OverwriteSink for Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Overwrite `length` bytes of `sink` with each pattern in `patterns`, in
/// order, in `block_size` blocks.
///
/// Zero-length sinks and empty pass sequences are a no-op `Done` — the
/// caller's subsequent deletion step still applies.
pub fn overwrite(
    sink: &mut impl OverwriteSink,
    length: u64,
    patterns: &[OverwritePattern],
    block_size: usize,
    cancel: &CancelToken,
) -> io::Result<OverwriteOutcome> {
    if length == 0 || patterns.is_empty() {
        return Ok(OverwriteOutcome::Done);
    }

    let rng = SystemRandom::new();
    let mut block = vec![0u8; block_size.max(1)];

    for pattern in patterns {
        sink.seek(SeekFrom::Start(0))?;
        if let Some(byte) = pattern.fill_byte() {
            block.fill(byte);
        }

        let mut remaining = length;
        while remaining > 0 {
            // Checked per block, not per pass: a mid-flight block always
            // completes, then cancellation wins.
            if cancel.is_cancelled() {
                sink.flush()?;
                sink.sync()?;
                return Ok(OverwriteOutcome::Cancelled);
            }

            let n = remaining.min(block.len() as u64) as usize;
            if pattern.fill_byte().is_none() {
                rng.fill(&mut block[..n])
                    .map_err(|_| io::Error::other("system CSPRNG failure"))?;
            }
            sink.write_all(&block[..n])?;
            remaining -= n as u64;
        }

        sink.flush()?;
        sink.sync()?;
    }

    Ok(OverwriteOutcome::Done)
}

/// Overwrite a file's content in place. Removal stays with the caller so a
/// cancelled overwrite never turns into a deletion.
pub fn overwrite_file(
    path: &Path,
    patterns: &[OverwritePattern],
    block_size: usize,
    cancel: &CancelToken,
) -> io::Result<OverwriteOutcome> {
    let length = fs::metadata(path)?.len();
    if length == 0 || patterns.is_empty() {
        return Ok(OverwriteOutcome::Done);
    }
    let mut file = OpenOptions::new().write(true).open(path)?;
    overwrite(&mut file, length, patterns, block_size, cancel)
}
