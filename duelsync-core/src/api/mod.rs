// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Duelsync API Layer
//!
//! High-level API for keeping a duel participant connected.
//!
//! # Overview
//!
//! The API layer wraps the network and storage layers behind one object,
//! [`DuelSession`], which coordinates:
//! - The connection state machine and reconnect policy
//! - The outbound queue and its recovery snapshot
//! - Host connectivity signals
//! - Event handling
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event system for callbacks
//! - [`leases`] - One live session per identity
//! - [`session`] - The session facade

pub mod config;
pub mod error;
pub mod events;
pub mod leases;
pub mod session;

pub use config::{ConfigError, SessionConfig, DEFAULT_HISTORY_CAPACITY};
pub use error::{SessionError, SessionResult};
pub use events::{CallbackHandler, EventDispatcher, EventHandler, SessionEvent};
pub use leases::{SessionLease, SessionLeases};
pub use session::{DuelSession, DuelSessionBuilder};
