// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Message Types
//!
//! Outbound and inbound message shapes exchanged with the match server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique outbound message identifier (UUID v4).
pub type MessageId = String;

/// Outbound message kinds the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Diagnostic message, echoed or ignored by the server.
    Test,
    /// A proof submitted for a duel round.
    SubmitProof,
}

impl MessageKind {
    /// All known kinds.
    pub const ALL: [MessageKind; 2] = [MessageKind::Test, MessageKind::SubmitProof];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Test => "test",
            MessageKind::SubmitProof => "submit_proof",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown message type: {}", s))
    }
}

/// A message waiting for (or undergoing) transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Unique message ID.
    pub id: MessageId,
    /// Message kind, sent as the envelope `type`.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Message body, sent as the envelope `data`.
    pub payload: Value,
    /// Unix timestamp (milliseconds) when the message was queued.
    pub enqueued_at: u64,
}

impl OutboundMessage {
    /// Creates a message with a fresh ID.
    pub fn new(kind: MessageKind, payload: Value, enqueued_at: u64) -> Self {
        OutboundMessage {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            enqueued_at,
        }
    }
}

/// A message received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Envelope `type`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Envelope `data`; always a JSON object.
    pub data: Value,
    /// Unix timestamp (milliseconds) when the frame arrived.
    pub received_at: u64,
}

/// Body of a `submit_proof` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub game_id: String,
    pub round_id: String,
    /// The proof text exactly as the participant entered it.
    pub payload: String,
}
