// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Storage error types.

use thiserror::Error;

/// Errors raised by a recovery backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while loading or saving a recovery snapshot.
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed recovery record: {0}")]
    Malformed(String),

    #[error("Recovery record belongs to {found}, expected {expected}")]
    IdentityMismatch { expected: String, found: String },

    #[error("Unsupported recovery record version {0}")]
    UnsupportedVersion(u32),
}
