// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Transport Layer
//!
//! Keeps one participant's socket to the duel server alive and carries
//! messages over it.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **Transport trait**: Platform-agnostic interface for socket I/O
//! - **Message types**: Outbound queue entries and inbound frames
//! - **Protocol layer**: JSON envelope encoding and decoding
//! - **Reconnect policy**: Exponential backoff parameters
//! - **Message queue**: Ordered buffer of unsent messages
//! - **Network monitor**: Online/offline and link-quality tracking
//! - **Connection manager**: The state machine tying it all together
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use duelsync_core::clock::ManualClock;
//! use duelsync_core::network::{
//!     ConnectionManager, MessageKind, MockTransport, OutboundMessage, ReconnectPolicy,
//! };
//!
//! let transport = MockTransport::new();
//! let handle = transport.clone();
//! let url = url::Url::parse("ws://localhost:8000/ws/42/alice").unwrap();
//! let mut conn = ConnectionManager::new(
//!     transport,
//!     url,
//!     ReconnectPolicy::default(),
//!     Arc::new(ManualClock::new()),
//! );
//!
//! // Queued while offline, delivered once connected
//! conn.enqueue(OutboundMessage::new(MessageKind::Test, serde_json::json!({}), 0));
//! conn.connect();
//! conn.poll();
//!
//! assert_eq!(handle.sent_types(), vec!["test".to_string()]);
//! ```

pub mod connection;
pub mod error;
pub mod message;
pub mod mock;
pub mod monitor;
pub mod policy;
pub mod protocol;
pub mod queue;
pub mod transport;

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub mod websocket;

pub use connection::{
    ConnectionEvent, ConnectionManager, DropReason, RetryTimer, DEFAULT_PROTOCOL_ERROR_THRESHOLD,
    MAX_FRAMES_PER_POLL,
};
pub use error::{ConnectionError, ConnectionErrorKind, NetworkError};
pub use message::{InboundMessage, MessageId, MessageKind, OutboundMessage, ProofSubmission};
pub use mock::MockTransport;
pub use monitor::{NetworkMonitor, NetworkQuality, NetworkSignal, NetworkTransition};
pub use policy::{PolicyError, ReconnectPolicy};
pub use protocol::{check_data, decode_message, encode_message, MAX_MESSAGE_SIZE};
pub use queue::{FlushReport, MessageQueue, QueueLimits, DEFAULT_MAX_QUEUED_MESSAGES};
pub use transport::{ConnectionState, Transport, TransportConfig, TransportResult};

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use websocket::WebSocketTransport;
