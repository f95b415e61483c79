// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Identity
//!
//! Which duel, and which participant in it, a connection represents.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Prefix for recovery records in the storage backend.
const RECOVERY_KEY_PREFIX: &str = "duelsync:recovery";

/// Immutable `(session_id, participant_id)` pair.
///
/// Used as the key for recovery snapshots and as the trailing path segments
/// of the WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    session_id: String,
    participant_id: String,
}

impl SessionIdentity {
    /// Creates a new identity.
    pub fn new(session_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        SessionIdentity {
            session_id: session_id.into(),
            participant_id: participant_id.into(),
        }
    }

    /// The duel (game) this connection belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The participant this connection speaks for.
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Returns true if both halves are non-blank.
    pub fn is_valid(&self) -> bool {
        !self.session_id.trim().is_empty() && !self.participant_id.trim().is_empty()
    }

    /// Builds the WebSocket endpoint: `<base>/<session_id>/<participant_id>`.
    ///
    /// Segments are percent-encoded, so ids containing `/` or `?` cannot
    /// escape their path position.
    pub fn endpoint_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.session_id)
                .push(&self.participant_id);
        }
        url
    }

    /// Storage key for this identity's recovery snapshot.
    pub fn recovery_key(&self) -> String {
        let session: String = byte_serialize(self.session_id.as_bytes()).collect();
        let participant: String = byte_serialize(self.participant_id.as_bytes()).collect();
        format!("{}:{}:{}", RECOVERY_KEY_PREFIX, session, participant)
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_appends_segments() {
        let base = Url::parse("wss://duels.example.com/ws").unwrap();
        let identity = SessionIdentity::new("game-42", "alice");

        assert_eq!(
            identity.endpoint_url(&base).as_str(),
            "wss://duels.example.com/ws/game-42/alice"
        );
    }

    #[test]
    fn test_endpoint_url_handles_trailing_slash() {
        let base = Url::parse("ws://localhost:8000/ws/").unwrap();
        let identity = SessionIdentity::new("7", "bob");

        assert_eq!(
            identity.endpoint_url(&base).as_str(),
            "ws://localhost:8000/ws/7/bob"
        );
    }

    #[test]
    fn test_endpoint_url_escapes_segments() {
        let base = Url::parse("ws://localhost:8000/ws").unwrap();
        let identity = SessionIdentity::new("a/b", "c?d");

        assert_eq!(
            identity.endpoint_url(&base).as_str(),
            "ws://localhost:8000/ws/a%2Fb/c%3Fd"
        );
    }

    #[test]
    fn test_recovery_keys_do_not_collide() {
        let a = SessionIdentity::new("x:y", "z");
        let b = SessionIdentity::new("x", "y:z");

        assert_ne!(a.recovery_key(), b.recovery_key());
        assert!(a.recovery_key().starts_with("duelsync:recovery:"));
    }

    #[test]
    fn test_is_valid_rejects_blank_parts() {
        assert!(SessionIdentity::new("g", "p").is_valid());
        assert!(!SessionIdentity::new("", "p").is_valid());
        assert!(!SessionIdentity::new("g", "  ").is_valid());
    }
}
