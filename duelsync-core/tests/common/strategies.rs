// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use duelsync_core::network::{MessageKind, OutboundMessage};
use proptest::prelude::*;
use serde_json::json;

/// Backoff parameters: (max_attempts, initial_ms, max_ms, multiplier).
pub fn policy_params_strategy() -> impl Strategy<Value = (u32, u64, u64, f64)> {
    (1u32..20, 1u64..5_000, 1.0f64..4.0).prop_flat_map(|(attempts, initial, mult)| {
        (
            Just(attempts),
            Just(initial),
            initial..initial.saturating_mul(100),
            Just(mult),
        )
    })
}

pub fn message_kind_strategy() -> impl Strategy<Value = MessageKind> {
    prop_oneof![Just(MessageKind::Test), Just(MessageKind::SubmitProof)]
}

/// Outbound messages with small JSON payloads.
pub fn outbound_message_strategy() -> impl Strategy<Value = OutboundMessage> {
    (message_kind_strategy(), "[a-zA-Z0-9 ]{0,24}", any::<u32>(), 0u64..1_000_000).prop_map(
        |(kind, text, n, at)| OutboundMessage::new(kind, json!({ "text": text, "n": n }), at),
    )
}

/// Non-empty batches of outbound messages.
pub fn outbound_messages_strategy(max: usize) -> impl Strategy<Value = Vec<OutboundMessage>> {
    prop::collection::vec(outbound_message_strategy(), 1..max)
}
