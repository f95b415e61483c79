// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SQLite recovery backend.
//!
//! Stores recovery records in a single table. Schema changes go through a
//! small versioned migration list tracked in `schema_version`, applied in
//! one transaction on open.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{RecoveryBackend, StorageError};
use crate::clock::current_timestamp_ms;

/// A single schema migration step.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_recovery_snapshots",
    sql: "CREATE TABLE IF NOT EXISTS recovery_snapshots (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );",
}];

/// SQLite-based recovery backend.
pub struct SqliteRecoveryBackend {
    conn: Connection,
}

impl SqliteRecoveryBackend {
    /// Opens or creates a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Creates an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StorageError> {
        run_migrations(&mut conn)?;
        Ok(SqliteRecoveryBackend { conn })
    }

    /// Current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        current_version(&self.conn)
    }

    /// Number of stored records.
    pub fn record_count(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM recovery_snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    let version: Option<u32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

fn run_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        debug!(version = migration.version, name = migration.name, "applying migration");
        tx.execute_batch(migration.sql).map_err(|e| {
            StorageError::Migration(format!("{} (v{}): {}", migration.name, migration.version, e))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, current_timestamp_ms() as i64],
        )?;
    }
    tx.commit()?;
    Ok(())
}

impl RecoveryBackend for SqliteRecoveryBackend {
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO recovery_snapshots (key, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload,
                                            updated_at = excluded.updated_at",
            params![key, value, current_timestamp_ms() as i64],
        )?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM recovery_snapshots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM recovery_snapshots WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let mut backend = SqliteRecoveryBackend::in_memory().unwrap();

        backend.write("duelsync:recovery:g1:alice", "{}").unwrap();
        assert_eq!(
            backend.read("duelsync:recovery:g1:alice").unwrap().as_deref(),
            Some("{}")
        );

        backend.remove("duelsync:recovery:g1:alice").unwrap();
        assert!(backend.read("duelsync:recovery:g1:alice").unwrap().is_none());
    }

    #[test]
    fn test_write_replaces_existing_record() {
        let mut backend = SqliteRecoveryBackend::in_memory().unwrap();

        backend.write("k", "first").unwrap();
        backend.write("k", "second").unwrap();

        assert_eq!(backend.read("k").unwrap().as_deref(), Some("second"));
        assert_eq!(backend.record_count().unwrap(), 1);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovery.db");

        let first = SqliteRecoveryBackend::open(&path).unwrap();
        assert_eq!(first.schema_version().unwrap(), 1);
        drop(first);

        let second = SqliteRecoveryBackend::open(&path).unwrap();
        assert_eq!(second.schema_version().unwrap(), 1);
    }
}
