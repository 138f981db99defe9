// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every destructive operation.
//
// Schema:
//   audit_log(
//     id        INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp TEXT    NOT NULL,   -- RFC 3339
//     action    TEXT    NOT NULL,   -- e.g. "wipe_start", "certificate_issued"
//     target    TEXT    NOT NULL,   -- canonical target path or artifact id
//     success   INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details   TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use scrubwerk_core::error::ScrubwerkError;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into a `ScrubwerkError::Database`.
fn db_err(e: rusqlite::Error) -> ScrubwerkError {
    ScrubwerkError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub target: String,
    pub success: bool,
    pub details: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
///
/// Every destructive or attestation-relevant operation (job start, file and
/// tree wipes, cancellations, certificate issuance, key loading) is recorded
/// with a timestamp, action verb, the target it touched, and a
/// success/failure flag.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// The `audit_log` table is created automatically if it does not already
    /// exist.  WAL mode is enabled for better concurrent-read performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScrubwerkError> {
        let conn = Connection::open(path).map_err(db_err)?;

        // Enable WAL for concurrent readers.
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT    NOT NULL,
                action    TEXT    NOT NULL,
                target    TEXT    NOT NULL,
                success   INTEGER NOT NULL,
                details   TEXT
            );",
        )
        .map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, ScrubwerkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT    NOT NULL,
                action    TEXT    NOT NULL,
                target    TEXT    NOT NULL,
                success   INTEGER NOT NULL,
                details   TEXT
            );",
        )
        .map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record a new audit entry.
    ///
    /// `action` is a short verb describing the operation (e.g.
    /// `"wipe_start"`, `"wipe_complete"`, `"certificate_issued"`).  `target`
    /// is the canonical path or artifact id the action applied to.
    #[instrument(skip(self, details), fields(%action, %target, success))]
    pub fn record(
        &self,
        action: &str,
        target: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), ScrubwerkError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if success { 1 } else { 0 };

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, target, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, target, success_int, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Retrieve all entries for a given target, ordered by timestamp
    /// ascending.
    pub fn entries_for_target(&self, target: &str) -> Result<Vec<AuditEntry>, ScrubwerkError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, target, success, details
                 FROM audit_log
                 WHERE target = ?1
                 ORDER BY timestamp ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![target], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    target: row.get(3)?,
                    success: row.get::<_, i32>(4)? != 0,
                    details: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, ScrubwerkError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, target, success, details
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    target: row.get(3)?,
                    success: row.get::<_, i32>(4)? != 0,
                    details: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, ScrubwerkError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}
