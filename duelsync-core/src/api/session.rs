// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Duel Session
//!
//! Main entry point: one participant's connection to one duel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::error::{SessionError, SessionResult};
use super::events::{CallbackHandler, EventDispatcher, EventHandler, SessionEvent};
use super::leases::{SessionLease, SessionLeases};
use crate::clock::{Clock, SystemClock};
use crate::identity::SessionIdentity;
use crate::network::{
    check_data, ConnectionError, ConnectionEvent, ConnectionManager, ConnectionState, InboundMessage,
    MessageId, MessageKind, MockTransport, NetworkMonitor, NetworkQuality, NetworkSignal,
    NetworkTransition, OutboundMessage, ProofSubmission, Transport,
};
use crate::storage::RecoveryStore;

/// A participant's live connection to a duel.
///
/// Coordinates:
/// - The connection state machine and its outbound queue
/// - Persistence of unsent messages across restarts
/// - Connectivity signals from the host
/// - Event dispatching
///
/// Nothing happens in the background. Call [`poll`](Self::poll) from the
/// host's loop; [`next_wakeup`](Self::next_wakeup) says how long it may
/// sleep in between.
///
/// # Example
///
/// ```
/// use duelsync_core::{DuelSession, MockTransport, SessionConfig, SessionIdentity};
/// use duelsync_core::api::SessionLeases;
///
/// let identity = SessionIdentity::new("game-42", "alice");
/// let config = SessionConfig::new("ws://localhost:8000/ws");
///
/// let mut session = DuelSession::builder(identity, MockTransport::new())
///     .config(config)
///     .leases(SessionLeases::new())
///     .build()
///     .unwrap();
///
/// session.on_event(|event| println!("{:?}", event));
/// session.poll();
/// session.submit_proof("game-42", "round-1", "x = 4");
/// ```
pub struct DuelSession<T: Transport = MockTransport> {
    identity: SessionIdentity,
    config: SessionConfig,
    connection: ConnectionManager<T>,
    monitor: NetworkMonitor,
    recovery: RecoveryStore,
    clock: Arc<dyn Clock>,
    events: EventDispatcher,
    history: VecDeque<InboundMessage>,
    last_error: Option<ConnectionError>,
    lease: Option<SessionLease>,
    disposed: bool,
}

impl<T: Transport> DuelSession<T> {
    /// Starts building a session for `identity` over `transport`.
    pub fn builder(identity: SessionIdentity, transport: T) -> DuelSessionBuilder<T> {
        DuelSessionBuilder::new(identity, transport)
    }

    /// Creates a session with in-memory recovery and the system clock.
    pub fn new(identity: SessionIdentity, transport: T, config: SessionConfig) -> SessionResult<Self> {
        Self::builder(identity, transport).config(config).build()
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // === Actions ===

    /// Starts connecting if idle.
    pub fn connect(&mut self) {
        if self.disposed {
            return;
        }
        self.connection.connect();
        self.process_events();
    }

    /// Queues a message of the given wire type.
    ///
    /// Unknown types and `data` that is not a JSON object are reported on
    /// the error channel and nothing is queued. Returns the new message's ID
    /// otherwise.
    pub fn send_message(&mut self, kind: &str, data: Value) -> Option<MessageId> {
        if self.disposed {
            warn!(%kind, "send on disposed session ignored");
            return None;
        }
        let kind = match kind.parse::<MessageKind>() {
            Ok(kind) => kind,
            Err(reason) => {
                self.report_error(ConnectionError::protocol(reason, self.clock.unix_millis()));
                return None;
            }
        };
        if let Err(e) = check_data(&data) {
            self.report_error(ConnectionError::protocol(e.to_string(), self.clock.unix_millis()));
            return None;
        }
        self.enqueue(kind, data)
    }

    /// Queues a `submit_proof` message.
    pub fn submit_proof(
        &mut self,
        game_id: &str,
        round_id: &str,
        proof_text: &str,
    ) -> Option<MessageId> {
        if self.disposed {
            return None;
        }
        let submission = ProofSubmission {
            game_id: game_id.to_string(),
            round_id: round_id.to_string(),
            payload: proof_text.to_string(),
        };
        match serde_json::to_value(&submission) {
            Ok(data) => self.enqueue(MessageKind::SubmitProof, data),
            Err(e) => {
                self.report_error(ConnectionError::protocol(e.to_string(), self.clock.unix_millis()));
                None
            }
        }
    }

    /// Manual reconnect. Resets the attempt counter unless already connecting
    /// or connected.
    pub fn reconnect(&mut self) {
        if self.disposed {
            return;
        }
        self.connection.reconnect();
        self.process_events();
    }

    /// Closes the socket. Queued messages stay queued.
    pub fn disconnect(&mut self) {
        if self.disposed {
            return;
        }
        self.connection.disconnect();
        self.process_events();
    }

    /// Feeds a connectivity signal from the host.
    ///
    /// Coming back online while disconnected or failed starts one reconnect.
    pub fn handle_network_signal(&mut self, signal: NetworkSignal) {
        if self.disposed {
            return;
        }
        let Some(transition) = self.monitor.observe(signal) else {
            return;
        };
        self.events.dispatch(SessionEvent::NetworkChanged(transition));

        match transition {
            NetworkTransition::WentOnline if self.connection.state().is_idle() => {
                info!(identity = %self.identity, "back online, reconnecting");
                self.connection.reconnect();
            }
            NetworkTransition::QualityChanged { to, .. } => {
                self.connection.set_network_quality(to);
            }
            _ => {}
        }
        self.process_events();
    }

    /// Runs one turn of the event loop.
    pub fn poll(&mut self) {
        if self.disposed {
            return;
        }
        self.connection.poll();
        self.process_events();
    }

    /// How long the host may wait before the next [`poll`](Self::poll).
    pub fn next_wakeup(&self) -> Option<Duration> {
        self.connection.next_wakeup()
    }

    /// Registers an event handler.
    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.events.add_handler(handler);
    }

    /// Registers a closure as an event handler.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(CallbackHandler::new(callback)));
    }

    /// Stops the session: cancels retries, closes the socket, releases the
    /// identity. Unsent messages stay persisted for the next session.
    /// Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.connection.disconnect();
        self.process_events();
        self.persist_queue();
        self.disposed = true;
        self.lease = None;
        info!(identity = %self.identity, pending = self.connection.queue_size(), "session disposed");
    }

    /// Disposes the session and deletes its recovery record.
    pub fn end_session(&mut self) {
        self.dispose();
        if let Err(e) = self.recovery.clear(&self.identity) {
            warn!(identity = %self.identity, error = %e, "failed to clear recovery record");
        }
    }

    // === Observers ===

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The most recent error, cleared on a successful connection.
    pub fn connection_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Recent inbound messages, oldest first.
    pub fn messages(&self) -> &VecDeque<InboundMessage> {
        &self.history
    }

    pub fn message_queue_size(&self) -> usize {
        self.connection.queue_size()
    }

    /// Copies of the unsent messages, oldest first.
    pub fn pending_messages(&self) -> Vec<OutboundMessage> {
        self.connection.queue().snapshot()
    }

    pub fn network_quality(&self) -> NetworkQuality {
        self.monitor.quality()
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Failed attempts since the last successful connection.
    pub fn reconnect_attempt(&self) -> u32 {
        self.connection.attempt()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // === Internals ===

    fn enqueue(&mut self, kind: MessageKind, data: Value) -> Option<MessageId> {
        let message = OutboundMessage::new(kind, data, self.clock.unix_millis());
        let id = message.id.clone();
        self.connection.enqueue(message);
        self.process_events();
        Some(id)
    }

    fn report_error(&mut self, error: ConnectionError) {
        warn!(identity = %self.identity, %error, "session error");
        self.last_error = Some(error.clone());
        self.events.dispatch(SessionEvent::Error(error));
    }

    fn record_inbound(&mut self, message: InboundMessage) {
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }

    fn persist_queue(&mut self) {
        let pending = self.connection.queue().snapshot();
        if let Err(e) = self
            .recovery
            .save(&self.identity, &pending, self.clock.unix_millis())
        {
            warn!(identity = %self.identity, error = %e, "failed to persist unsent messages");
        }
    }

    /// Applies connection events to session state, persists the queue if
    /// it changed, then hands the events to subscribers.
    fn process_events(&mut self) {
        let events = self.connection.drain_events();
        if events.is_empty() {
            return;
        }

        let mut queue_changed = false;
        for event in &events {
            match event {
                ConnectionEvent::StateChanged {
                    to: ConnectionState::Connected,
                    ..
                } => self.last_error = None,
                ConnectionEvent::MessageReceived(message) => self.record_inbound(message.clone()),
                ConnectionEvent::QueueChanged { .. } => queue_changed = true,
                ConnectionEvent::Error(error) => self.last_error = Some(error.clone()),
                _ => {}
            }
        }

        if queue_changed {
            self.persist_queue();
        }

        for event in events {
            self.events.dispatch(event.into());
        }
    }
}

impl<T: Transport> Drop for DuelSession<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Builder for creating [`DuelSession`] instances.
pub struct DuelSessionBuilder<T: Transport> {
    identity: SessionIdentity,
    transport: T,
    config: SessionConfig,
    recovery: Option<RecoveryStore>,
    clock: Option<Arc<dyn Clock>>,
    leases: Option<SessionLeases>,
    handlers: Vec<Arc<dyn EventHandler>>,
    online: bool,
}

impl<T: Transport> DuelSessionBuilder<T> {
    /// Creates a new builder with default configuration.
    pub fn new(identity: SessionIdentity, transport: T) -> Self {
        DuelSessionBuilder {
            identity,
            transport,
            config: SessionConfig::default(),
            recovery: None,
            clock: None,
            leases: None,
            handlers: Vec::new(),
            online: true,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the server base URL.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Sets where unsent messages are persisted. Defaults to memory.
    pub fn recovery(mut self, store: RecoveryStore) -> Self {
        self.recovery = Some(store);
        self
    }

    /// Sets the time source. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the lease registry. Defaults to [`SessionLeases::global`].
    pub fn leases(mut self, leases: SessionLeases) -> Self {
        self.leases = Some(leases);
        self
    }

    /// Registers a handler before construction, so it sees restore events.
    pub fn subscribe(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Sets the initial connectivity. Defaults to online.
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Builds the session.
    ///
    /// Restores any persisted unsent messages and, if configured, starts
    /// connecting; the socket opens on the first poll.
    pub fn build(self) -> SessionResult<DuelSession<T>> {
        if !self.identity.is_valid() {
            return Err(SessionError::InvalidIdentity(self.identity.to_string()));
        }
        self.config.validate()?;

        let leases = self.leases.unwrap_or_else(SessionLeases::global);
        let lease = leases.acquire(&self.identity)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let endpoint = self.identity.endpoint_url(&self.config.endpoint_base()?);
        let connection = ConnectionManager::new(
            self.transport,
            endpoint,
            self.config.reconnect.clone(),
            clock.clone(),
        )
        .with_transport_config(self.config.transport_config())
        .with_queue_limits(self.config.queue_limits)
        .with_protocol_error_threshold(self.config.protocol_error_threshold);

        let mut events = EventDispatcher::new();
        for handler in self.handlers {
            events.add_handler(handler);
        }

        let history_capacity = self.config.history_capacity;
        let mut session = DuelSession {
            identity: self.identity,
            config: self.config,
            connection,
            monitor: NetworkMonitor::new(self.online),
            recovery: self.recovery.unwrap_or_default(),
            clock,
            events,
            history: VecDeque::with_capacity(history_capacity),
            last_error: None,
            lease: Some(lease),
            disposed: false,
        };

        session.restore();
        if session.config.auto_connect {
            session.connect();
        }
        Ok(session)
    }
}

impl<T: Transport> DuelSession<T> {
    fn restore(&mut self) {
        let Some(snapshot) = self.recovery.load(&self.identity) else {
            return;
        };
        let count = snapshot.unsent_messages.len();
        info!(identity = %self.identity, count, "restoring recovery snapshot");
        self.connection.restore(snapshot.unsent_messages);
        self.process_events();
        self.events.dispatch(SessionEvent::Restored { count });
    }
}
