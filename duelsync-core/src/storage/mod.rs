// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Durable key-value storage for unsent-message snapshots, so a restarted
//! client can pick up its queue where it left off. The storage layer only
//! sees opaque string records; [`RecoveryStore`] owns the record format.

mod error;
mod memory;
mod recovery;
mod sqlite;

pub use error::{RecoveryError, StorageError};
pub use memory::MemoryRecoveryBackend;
pub use recovery::{RecoverySnapshot, RecoveryStore, SNAPSHOT_VERSION};
pub use sqlite::SqliteRecoveryBackend;

/// Key-value backend holding recovery records.
///
/// Keys come from [`SessionIdentity::recovery_key`](crate::SessionIdentity::recovery_key)
/// and values are serialized snapshots. Implementations must make a `write`
/// visible to a later `read` of the same key, including across process
/// restarts for durable backends.
pub trait RecoveryBackend: Send {
    /// Stores `value` under `key`, replacing any previous record.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Reads the record stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Deletes the record under `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}
