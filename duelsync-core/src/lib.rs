// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Duelsync Core Library
//!
//! Resilient real-time connection client for duel sessions. Keeps a
//! participant's socket to the match server alive across flaky networks and
//! restarts, delivers outbound messages in order, and persists anything
//! unsent so a restarted client can pick up where it left off.

pub mod api;
pub mod clock;
pub mod identity;
pub mod network;
pub mod storage;

pub use api::{
    CallbackHandler, DuelSession, EventHandler, SessionConfig, SessionError, SessionEvent,
    SessionResult,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::SessionIdentity;
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use network::WebSocketTransport;
pub use network::{
    ConnectionError, ConnectionErrorKind, ConnectionManager, ConnectionState, InboundMessage,
    MessageKind, MessageQueue, MockTransport, NetworkError, NetworkMonitor, NetworkQuality,
    NetworkSignal, OutboundMessage, QueueLimits, ReconnectPolicy, Transport,
};
pub use storage::{
    MemoryRecoveryBackend, RecoveryBackend, RecoveryError, RecoverySnapshot, RecoveryStore,
    SqliteRecoveryBackend, StorageError,
};
