// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! Platform-agnostic abstraction for the socket carrying a duel session.

use std::fmt;
use std::time::Duration;

use url::Url;

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Connection state as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected, and not trying to be.
    Disconnected,
    /// Socket open in progress.
    Connecting,
    /// Connected and ready.
    Connected,
    /// Connection lost or refused; a retry is scheduled.
    Reconnecting {
        /// Attempt number of the scheduled retry (1-indexed).
        attempt: u32,
        /// Delay before that retry, in milliseconds.
        delay_ms: u64,
    },
    /// Retries exhausted. Waiting for a manual reconnect.
    Failed,
}

impl ConnectionState {
    /// Returns true for `Reconnecting { .. }`.
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, ConnectionState::Reconnecting { .. })
    }

    /// Returns true if the connection is idle and will not recover on its
    /// own.
    pub fn is_idle(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("DISCONNECTED"),
            ConnectionState::Connecting => f.write_str("CONNECTING"),
            ConnectionState::Connected => f.write_str("CONNECTED"),
            ConnectionState::Reconnecting { attempt, delay_ms } => {
                write!(f, "RECONNECTING (attempt {} in {}ms)", attempt, delay_ms)
            }
            ConnectionState::Failed => f.write_str("FAILED"),
        }
    }
}

/// Configuration for transport connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound for TCP connect plus the WebSocket handshake.
    pub handshake_timeout: Duration,
    /// How long a single receive may block waiting for a frame.
    pub read_timeout: Duration,
    /// Write timeout once connected.
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            handshake_timeout: Duration::from_millis(300),
            read_timeout: Duration::from_millis(50),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Transport trait for the session socket.
///
/// This abstracts the underlying socket (WebSocket in production, an
/// in-memory fake in tests) so the connection state machine can be driven
/// without a network.
///
/// # Synchronous Interface
///
/// Methods block for bounded time only: `connect` for at most the
/// handshake timeout, `receive` for at most the read timeout. The owning
/// [`ConnectionManager`](super::ConnectionManager) calls them from its
/// single-threaded poll loop.
pub trait Transport: Send {
    /// Opens the socket to `url`.
    ///
    /// Timeouts must surface as [`NetworkError::Timeout`].
    fn connect(&mut self, url: &Url, config: &TransportConfig) -> TransportResult<()>;

    /// Closes the socket. Safe to call when not connected.
    fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns true while the socket is open.
    fn is_open(&self) -> bool;

    /// Sends one text frame.
    fn send(&mut self, frame: &str) -> TransportResult<()>;

    /// Receives the next text frame.
    ///
    /// Control frames are handled internally and never end a read early.
    /// Returns `Ok(None)` if no data frame arrived within the read timeout,
    /// `Err(InvalidMessage)` for a frame that is not text, and
    /// `Err(ConnectionClosed)` once the peer has gone away.
    fn receive(&mut self) -> TransportResult<Option<String>>;
}
