// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persistent agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Shared key expected in the `X-API-Key` header of every request.
    pub api_key: String,
    /// Port for the HTTP control API (default 5050).
    pub port: u16,
    /// Extra protected roots appended to the built-in deny-list.
    pub protected_roots: Vec<PathBuf>,
    /// Block size in bytes for overwrite I/O.
    pub overwrite_block_size: usize,
    /// Enable audit trail logging.
    pub audit_enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: "admin".to_string(),
            port: 5050,
            protected_roots: Vec::new(),
            overwrite_block_size: 4096,
            audit_enabled: true,
        }
    }
}
