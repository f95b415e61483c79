// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Errors that can stop a session from being created. Once a session
//! exists, problems are reported through its error channel instead.

use thiserror::Error;

use super::config::ConfigError;
use crate::storage::StorageError;

/// Error type for session construction.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The recovery store could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session or participant id is blank.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Another live session already owns this identity.
    #[error("a session for {0} is already active")]
    AlreadyActive(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
