// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Property tests for backoff, outbound ordering, and recovery.

mod common;

use common::helpers::{config, unique_identity, Harness};
use common::strategies::{outbound_messages_strategy, policy_params_strategy};
use duelsync_core::api::{SessionEvent, SessionLeases};
use duelsync_core::network::{MockTransport, ReconnectPolicy};
use duelsync_core::storage::MemoryRecoveryBackend;
use proptest::prelude::*;
use serde_json::{json, Value};

proptest! {
    #[test]
    fn prop_backoff_is_capped_and_non_decreasing(
        (attempts, initial, max, mult) in policy_params_strategy()
    ) {
        let policy = ReconnectPolicy::from_millis(attempts, initial, max, mult).unwrap();

        prop_assert_eq!(policy.delay_for_attempt(1).as_millis() as u64, initial);
        for n in 1..attempts {
            let here = policy.delay_for_attempt(n);
            let next = policy.delay_for_attempt(n + 1);
            prop_assert!(here <= next);
            prop_assert!(next.as_millis() as u64 <= max);
        }
    }

    #[test]
    fn prop_backoff_matches_formula(
        (attempts, initial, max, mult) in policy_params_strategy()
    ) {
        let policy = ReconnectPolicy::from_millis(attempts, initial, max, mult).unwrap();

        for n in 1..=attempts {
            let expected = (initial as f64 * mult.powi(n as i32 - 1)).min(max as f64).round() as u64;
            prop_assert_eq!(policy.delay_for_attempt(n).as_millis() as u64, expected);
        }
    }

    #[test]
    fn prop_offline_sends_flush_in_order(payloads in prop::collection::vec(any::<i64>(), 1..40)) {
        let mut h = Harness::new(config().with_auto_connect(false));
        for p in &payloads {
            h.session.send_message("test", json!({ "p": p }));
        }

        h.session.connect();
        h.session.poll();

        let sent: Vec<Value> = h
            .transport
            .sent_frames()
            .iter()
            .map(|f| serde_json::from_str::<Value>(f).unwrap()["data"].clone())
            .collect();
        let expected: Vec<Value> = payloads.iter().map(|p| json!({ "p": p })).collect();
        prop_assert_eq!(sent, expected);
        prop_assert_eq!(h.session.message_queue_size(), 0);
    }

    #[test]
    fn prop_restart_restores_pending_queue(messages in outbound_messages_strategy(30)) {
        let identity = unique_identity();
        let backend = MemoryRecoveryBackend::new();
        let leases = SessionLeases::new();

        let mut first = Harness::with_parts(
            identity.clone(),
            config().with_auto_connect(false),
            MockTransport::new(),
            backend.clone(),
            leases.clone(),
        );
        for m in &messages {
            prop_assert!(first.session.send_message(m.kind.as_str(), m.payload.clone()).is_some());
        }
        let expected = first.session.pending_messages();
        prop_assert_eq!(expected.len(), messages.len());
        drop(first);

        let second = Harness::with_parts(
            identity,
            config().with_auto_connect(false),
            MockTransport::new(),
            backend,
            leases,
        );

        prop_assert_eq!(second.session.pending_messages(), expected);
        let restored = SessionEvent::Restored { count: messages.len() };
        prop_assert!(second.recorder.events().contains(&restored));
    }
}
