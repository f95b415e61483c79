// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types
//!
//! Transport-level failures and the classified errors reported to
//! session subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network and transport error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Message receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport not connected")]
    NotConnected,
}

impl NetworkError {
    /// Returns true if the error concerns a single frame rather than the
    /// connection carrying it.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            NetworkError::InvalidMessage(_) | NetworkError::Serialization(_)
        )
    }
}

/// Classification of errors surfaced to session subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionErrorKind {
    /// Socket failed to open or dropped while retries remain. Advisory.
    TransientNetwork,
    /// A frame could not be understood. The connection stays up.
    Protocol,
    /// Retries exhausted. Only a manual reconnect resumes.
    Fatal,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionErrorKind::TransientNetwork => "transient network error",
            ConnectionErrorKind::Protocol => "protocol error",
            ConnectionErrorKind::Fatal => "fatal error",
        };
        f.write_str(name)
    }
}

/// An error reported through the session's error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ConnectionError {
    /// What class of failure this is.
    pub kind: ConnectionErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Unix timestamp (milliseconds) when the error occurred.
    pub occurred_at: u64,
}

impl ConnectionError {
    /// Creates a new error.
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>, occurred_at: u64) -> Self {
        ConnectionError {
            kind,
            message: message.into(),
            occurred_at,
        }
    }

    /// Creates a transient network error.
    pub fn transient(message: impl Into<String>, occurred_at: u64) -> Self {
        Self::new(ConnectionErrorKind::TransientNetwork, message, occurred_at)
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>, occurred_at: u64) -> Self {
        Self::new(ConnectionErrorKind::Protocol, message, occurred_at)
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>, occurred_at: u64) -> Self {
        Self::new(ConnectionErrorKind::Fatal, message, occurred_at)
    }

    /// Returns true if the caller must act before the connection resumes.
    pub fn is_fatal(&self) -> bool {
        self.kind == ConnectionErrorKind::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let errors = vec![
            (
                NetworkError::ConnectionFailed("refused".into()),
                "Connection failed: refused",
            ),
            (NetworkError::ConnectionClosed, "Connection closed"),
            (NetworkError::Timeout, "Connection timeout"),
            (NetworkError::NotConnected, "Transport not connected"),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_frame_errors_are_distinguished() {
        assert!(NetworkError::InvalidMessage("x".into()).is_frame_error());
        assert!(!NetworkError::ConnectionClosed.is_frame_error());
        assert!(!NetworkError::SendFailed("broken pipe".into()).is_frame_error());
    }

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::fatal("gave up after 3 attempts", 10);
        assert_eq!(err.to_string(), "fatal error: gave up after 3 attempts");
        assert!(err.is_fatal());
        assert!(!ConnectionError::protocol("bad frame", 10).is_fatal());
    }
}
