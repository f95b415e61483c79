// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session fixtures driven by a mock transport and a manual clock.

use std::sync::{Arc, Mutex};

use duelsync_core::api::{DuelSession, EventHandler, SessionConfig, SessionEvent, SessionLeases};
use duelsync_core::network::{ConnectionError, ConnectionState, MockTransport, ReconnectPolicy};
use duelsync_core::storage::{MemoryRecoveryBackend, RecoveryStore};
use duelsync_core::{ManualClock, SessionIdentity};

pub const SERVER_URL: &str = "ws://localhost:8000/ws";

/// Identity unique to the calling test.
pub fn unique_identity() -> SessionIdentity {
    SessionIdentity::new(
        format!("game-{}", uuid::Uuid::new_v4()),
        format!("player-{}", uuid::Uuid::new_v4()),
    )
}

pub fn policy(max_attempts: u32, initial_ms: u64, max_ms: u64, multiplier: f64) -> ReconnectPolicy {
    ReconnectPolicy::from_millis(max_attempts, initial_ms, max_ms, multiplier).unwrap()
}

pub fn config() -> SessionConfig {
    SessionConfig::new(SERVER_URL)
}

/// Records every event a session dispatches.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventHandler for Recorder {
    fn on_event(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Delays of every `Reconnecting` state entered, in order.
    pub fn reconnect_delays(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged {
                    to: ConnectionState::Reconnecting { delay_ms, .. },
                    ..
                } => Some(delay_ms),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ConnectionError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }
}

/// A session plus handles on everything around it.
pub struct Harness {
    pub session: DuelSession<MockTransport>,
    pub transport: MockTransport,
    pub clock: ManualClock,
    pub backend: MemoryRecoveryBackend,
    pub recorder: Recorder,
    pub leases: SessionLeases,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(
            unique_identity(),
            config,
            MockTransport::new(),
            MemoryRecoveryBackend::new(),
            SessionLeases::new(),
        )
    }

    /// Builds a session around existing pieces, so a test can restart a
    /// session over the same records.
    pub fn with_parts(
        identity: SessionIdentity,
        config: SessionConfig,
        transport: MockTransport,
        backend: MemoryRecoveryBackend,
        leases: SessionLeases,
    ) -> Self {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let session = DuelSession::builder(identity, transport.clone())
            .config(config)
            .recovery(RecoveryStore::new(backend.clone()))
            .clock(Arc::new(clock.clone()))
            .leases(leases.clone())
            .subscribe(Arc::new(recorder.clone()))
            .build()
            .unwrap();

        Harness {
            session,
            transport,
            clock,
            backend,
            recorder,
            leases,
        }
    }

    /// Session that has completed its first connect.
    pub fn connected(config: SessionConfig) -> Self {
        let mut harness = Self::new(config);
        harness.session.poll();
        assert_eq!(harness.session.connection_state(), ConnectionState::Connected);
        harness.recorder.clear();
        harness
    }

    /// Advances time and polls once.
    pub fn advance_and_poll(&mut self, ms: u64) {
        self.clock.advance_ms(ms);
        self.session.poll();
    }
}
