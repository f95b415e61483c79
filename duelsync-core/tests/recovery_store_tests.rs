// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for recovery snapshots across session restarts, and for the
//! one-session-per-identity rule.

mod common;

use std::sync::Arc;

use common::helpers::{config, unique_identity, Harness, Recorder};
use duelsync_core::api::{DuelSession, SessionError, SessionEvent, SessionLeases};
use duelsync_core::network::{ConnectionState, MessageKind, MockTransport, OutboundMessage};
use duelsync_core::storage::{
    MemoryRecoveryBackend, RecoveryBackend, RecoveryStore, SqliteRecoveryBackend,
};
use serde_json::json;

#[test]
fn test_unsent_messages_survive_restart() {
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
    first.session.send_message("test", json!({ "text": "one" }));
    first.session.submit_proof("g", "r", "proof");
    let expected = first.session.pending_messages();
    drop(first);

    assert_eq!(backend.len(), 1);

    let mut second = Harness::with_parts(
        identity,
        config(),
        MockTransport::new(),
        backend.clone(),
        leases,
    );
    assert_eq!(second.session.pending_messages(), expected);
    assert!(second
        .recorder
        .events()
        .contains(&SessionEvent::Restored { count: 2 }));

    second.session.poll();
    assert_eq!(second.transport.sent_types(), vec!["test", "submit_proof"]);

    // Queue drained, so the record is gone
    assert!(backend.is_empty());
}

#[test]
fn test_dispose_keeps_snapshot() {
    let mut h = Harness::new(config().with_auto_connect(false));
    h.session.send_message("test", json!({}));

    h.session.dispose();

    let key = h.session.identity().recovery_key();
    assert!(h.backend.raw(&key).is_some());
}

#[test]
fn test_end_session_clears_snapshot() {
    let mut h = Harness::new(config().with_auto_connect(false));
    h.session.send_message("test", json!({}));
    assert_eq!(h.backend.len(), 1);

    h.session.end_session();

    assert!(h.backend.is_empty());
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn test_corrupt_snapshot_discarded() {
    let identity = unique_identity();
    let backend = MemoryRecoveryBackend::new();
    backend.insert_raw(&identity.recovery_key(), "{ not a snapshot");

    let h = Harness::with_parts(
        identity.clone(),
        config().with_auto_connect(false),
        MockTransport::new(),
        backend.clone(),
        SessionLeases::new(),
    );

    assert_eq!(h.session.message_queue_size(), 0);
    assert!(backend.raw(&identity.recovery_key()).is_none());
    assert!(h.recorder.events().is_empty());
}

#[test]
fn test_sessions_do_not_share_snapshots() {
    let backend = MemoryRecoveryBackend::new();
    let leases = SessionLeases::new();
    let alice = unique_identity();
    let bob = unique_identity();

    let mut a = Harness::with_parts(
        alice,
        config().with_auto_connect(false),
        MockTransport::new(),
        backend.clone(),
        leases.clone(),
    );
    a.session.send_message("test", json!({ "from": "alice" }));

    let b = Harness::with_parts(
        bob,
        config().with_auto_connect(false),
        MockTransport::new(),
        backend.clone(),
        leases,
    );
    assert_eq!(b.session.message_queue_size(), 0);
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_sqlite_snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recovery.db");
    let identity = unique_identity();
    let messages = vec![
        OutboundMessage::new(MessageKind::Test, json!({ "n": 1 }), 10),
        OutboundMessage::new(MessageKind::SubmitProof, json!({ "n": 2 }), 20),
    ];

    {
        let mut store = RecoveryStore::new(SqliteRecoveryBackend::open(&path).unwrap());
        store.save(&identity, &messages, 30).unwrap();
    }

    let mut store = RecoveryStore::new(SqliteRecoveryBackend::open(&path).unwrap());
    let snapshot = store.load(&identity).unwrap();
    assert_eq!(snapshot.unsent_messages, messages);
    assert_eq!(snapshot.saved_at, 30);
    assert_eq!(&snapshot.identity, &identity);
}

#[test]
fn test_sqlite_backed_session_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recovery.db");
    let identity = unique_identity();
    let leases = SessionLeases::new();

    {
        let mut session = DuelSession::builder(identity.clone(), MockTransport::new())
            .config(config().with_auto_connect(false))
            .recovery(RecoveryStore::new(SqliteRecoveryBackend::open(&path).unwrap()))
            .leases(leases.clone())
            .build()
            .unwrap();
        session.send_message("test", json!({ "text": "persisted" }));
    }

    let backend = SqliteRecoveryBackend::open(&path).unwrap();
    assert!(backend.read(&identity.recovery_key()).unwrap().is_some());

    let recorder = Recorder::default();
    let session = DuelSession::builder(identity, MockTransport::new())
        .config(config().with_auto_connect(false))
        .recovery(RecoveryStore::new(backend))
        .leases(leases)
        .subscribe(Arc::new(recorder.clone()))
        .build()
        .unwrap();

    assert_eq!(session.message_queue_size(), 1);
    assert_eq!(
        session.pending_messages()[0].payload,
        json!({ "text": "persisted" })
    );
    assert!(recorder
        .events()
        .contains(&SessionEvent::Restored { count: 1 }));
}

// === Leases ===

#[test]
fn test_second_session_for_identity_refused() {
    let identity = unique_identity();
    let leases = SessionLeases::new();

    let first = DuelSession::builder(identity.clone(), MockTransport::new())
        .config(config())
        .leases(leases.clone())
        .build()
        .unwrap();

    let second = DuelSession::builder(identity.clone(), MockTransport::new())
        .config(config())
        .leases(leases.clone())
        .build();
    assert!(matches!(second, Err(SessionError::AlreadyActive(_))));

    drop(first);
    assert!(DuelSession::builder(identity, MockTransport::new())
        .config(config())
        .leases(leases)
        .build()
        .is_ok());
}

#[test]
fn test_dispose_releases_lease() {
    let mut h = Harness::new(config());
    let identity = h.session.identity().clone();
    assert!(h.leases.is_active(&identity));

    h.session.dispose();
    assert!(!h.leases.is_active(&identity));
}

#[test]
fn test_invalid_identity_refused() {
    let result = DuelSession::builder(
        duelsync_core::SessionIdentity::new("  ", "alice"),
        MockTransport::new(),
    )
    .config(config())
    .leases(SessionLeases::new())
    .build();

    assert!(matches!(result, Err(SessionError::InvalidIdentity(_))));
}

#[test]
fn test_missing_server_url_refused() {
    let result = DuelSession::builder(unique_identity(), MockTransport::new())
        .leases(SessionLeases::new())
        .build();

    assert!(matches!(result, Err(SessionError::Config(_))));
}
