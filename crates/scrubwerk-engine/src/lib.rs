// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scrubwerk Engine — target classification, multi-pass overwrite, and the
// single-worker erase job state machine.  This crate bridges between the
// core domain types defined in `scrubwerk-core` and the actual destructive
// filesystem work, handing completed jobs to `scrubwerk-attest` for signing.

pub mod cancel;
pub mod classifier;
pub mod devices;
pub mod engine;
pub mod overwrite;
pub mod volume;

pub use cancel::CancelToken;
pub use classifier::PathClassifier;
pub use engine::EraseEngine;
pub use overwrite::OverwriteOutcome;
pub use volume::{OsVolumeTools, ScrubOutcome, VolumeTools};
