// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager
//!
//! Owns the socket for one session identity and runs the connection state
//! machine: open, retry with backoff, give up, and flush queued messages
//! whenever the socket is up.
//!
//! Everything happens inside calls on the manager. External happenings
//! (a method call, a socket result, a timer coming due) become a
//! [`Trigger`] that [`ConnectionManager::dispatch`] routes to one handler
//! per state-machine edge. Observable consequences are collected as
//! [`ConnectionEvent`]s for the owner to drain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use url::Url;

use super::error::{ConnectionError, NetworkError};
use super::message::{InboundMessage, MessageId, OutboundMessage};
use super::monitor::NetworkQuality;
use super::policy::ReconnectPolicy;
use super::protocol::{decode_message, encode_message};
use super::queue::{MessageQueue, QueueLimits};
use super::transport::{ConnectionState, Transport, TransportConfig};
use crate::clock::Clock;

/// Upper bound on frames read in a single poll, so a chatty server cannot
/// starve the rest of the loop.
pub const MAX_FRAMES_PER_POLL: usize = 64;

/// Consecutive malformed frames before the problem is escalated.
pub const DEFAULT_PROTOCOL_ERROR_THRESHOLD: u32 = 3;

/// Gap kept between the handshake timeout and the first retry delay.
const HANDSHAKE_MARGIN: Duration = Duration::from_millis(1);

/// Why queued messages were discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The queue exceeded its message limit.
    Capacity,
    /// The message waited longer than the configured TTL.
    Expired,
    /// The message could not be encoded into a frame.
    Unencodable,
}

/// Something the owner of a [`ConnectionManager`] should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection state changed.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// A frame arrived and parsed.
    MessageReceived(InboundMessage),
    /// A queued message was handed to the transport.
    MessageSent { id: MessageId },
    /// The queue contents changed.
    QueueChanged { size: usize },
    /// Messages were removed from the queue without being sent.
    MessagesDropped {
        ids: Vec<MessageId>,
        reason: DropReason,
    },
    /// An error for the session's error channel.
    Error(ConnectionError),
    /// Malformed frames keep arriving.
    ProtocolErrorsEscalated { consecutive: u32 },
}

/// A scheduled reconnect attempt.
///
/// Cancelling is dropping it: the manager holds at most one, and every
/// transition that supersedes the retry clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimer {
    attempt: u32,
    due: Instant,
}

impl RetryTimer {
    fn schedule(now: Instant, delay: Duration, attempt: u32) -> Self {
        RetryTimer {
            attempt,
            due: now + delay,
        }
    }

    /// Attempt number this timer will start.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// When the retry fires.
    pub fn due(&self) -> Instant {
        self.due
    }

    /// Time left until the retry fires.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.due.saturating_duration_since(now)
    }

    fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
enum Trigger {
    Start,
    ManualReconnect,
    OpenSucceeded,
    OpenFailed(NetworkError),
    ConnectionLost(NetworkError),
    RetryDue,
    Close,
}

/// Connection manager with automatic reconnection.
///
/// Wraps a transport implementation and adds:
/// - Exponential backoff retries governed by a [`ReconnectPolicy`]
/// - An ordered outbound [`MessageQueue`], flushed whenever connected
/// - Inbound frame parsing, with malformed frames reported but tolerated
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use duelsync_core::clock::SystemClock;
/// use duelsync_core::network::{ConnectionManager, ConnectionState, MockTransport, ReconnectPolicy};
///
/// let url = url::Url::parse("ws://localhost:8000/ws/42/alice").unwrap();
/// let mut conn = ConnectionManager::new(
///     MockTransport::new(),
///     url,
///     ReconnectPolicy::default(),
///     Arc::new(SystemClock),
/// );
///
/// conn.connect();
/// assert_eq!(conn.state(), ConnectionState::Connecting);
/// conn.poll();
/// assert_eq!(conn.state(), ConnectionState::Connected);
/// ```
pub struct ConnectionManager<T: Transport> {
    transport: T,
    endpoint: Url,
    transport_config: TransportConfig,
    policy: ReconnectPolicy,
    queue: MessageQueue,
    clock: Arc<dyn Clock>,
    state: ConnectionState,
    attempt: u32,
    retry_timer: Option<RetryTimer>,
    /// Set on entering `Connecting`; the socket open runs on the next poll.
    open_pending: bool,
    quality: NetworkQuality,
    protocol_error_streak: u32,
    protocol_error_threshold: u32,
    outbox: Vec<ConnectionEvent>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a new connection manager in the `Disconnected` state.
    pub fn new(
        transport: T,
        endpoint: Url,
        policy: ReconnectPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ConnectionManager {
            transport,
            endpoint,
            transport_config: TransportConfig::default(),
            policy,
            queue: MessageQueue::new(),
            clock,
            state: ConnectionState::Disconnected,
            attempt: 0,
            retry_timer: None,
            open_pending: false,
            quality: NetworkQuality::Unknown,
            protocol_error_streak: 0,
            protocol_error_threshold: DEFAULT_PROTOCOL_ERROR_THRESHOLD,
            outbox: Vec::new(),
        }
    }

    /// Sets transport timeouts.
    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Sets queue retention limits.
    pub fn with_queue_limits(mut self, limits: QueueLimits) -> Self {
        self.queue = MessageQueue::with_limits(limits);
        self
    }

    /// Sets how many consecutive malformed frames trigger escalation.
    pub fn with_protocol_error_threshold(mut self, threshold: u32) -> Self {
        self.protocol_error_threshold = threshold.max(1);
        self
    }

    // === Observers ===

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns true if connected and ready.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Failures since the last successful connection or manual reconnect.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The pending retry, if one is scheduled.
    pub fn retry_timer(&self) -> Option<RetryTimer> {
        self.retry_timer
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Read-only view of pending outbound messages.
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Number of pending outbound messages.
    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub fn network_quality(&self) -> NetworkQuality {
        self.quality
    }

    /// Consecutive malformed frames since the last good one.
    pub fn protocol_error_streak(&self) -> u32 {
        self.protocol_error_streak
    }

    /// Handshake timeout after adjusting for network quality. Always
    /// shorter than the policy's first backoff step.
    pub fn effective_handshake_timeout(&self) -> Duration {
        let scaled = self.transport_config.handshake_timeout * self.quality.handshake_timeout_factor();
        let ceiling = self.policy.initial_delay().saturating_sub(HANDSHAKE_MARGIN);
        scaled.min(ceiling).max(HANDSHAKE_MARGIN)
    }

    /// How long the owner may sleep before the next poll has work to do.
    ///
    /// `None` means nothing is scheduled; while connected the owner should
    /// keep polling to read frames.
    pub fn next_wakeup(&self) -> Option<Duration> {
        if self.open_pending {
            return Some(Duration::ZERO);
        }
        self.retry_timer
            .map(|timer| timer.remaining(self.clock.now()))
    }

    // === Actions ===

    /// Starts connecting if idle. Does nothing in other states; after
    /// `Failed` only [`reconnect`](Self::reconnect) resumes.
    pub fn connect(&mut self) {
        self.dispatch(Trigger::Start);
    }

    /// Manual reconnect: resets the attempt counter, cancels any pending
    /// retry, and starts connecting. Does nothing while already
    /// connecting or connected.
    pub fn reconnect(&mut self) {
        self.dispatch(Trigger::ManualReconnect);
    }

    /// User-initiated close. Always lands in `Disconnected`.
    pub fn disconnect(&mut self) {
        self.dispatch(Trigger::Close);
    }

    /// Queues a message and, if connected, flushes immediately.
    pub fn enqueue(&mut self, message: OutboundMessage) {
        debug!(id = %message.id, kind = %message.kind, "enqueue");
        let evicted = self.queue.enqueue(message);
        self.report_drops(evicted, DropReason::Capacity);
        self.emit_queue_changed();

        if self.is_connected() {
            self.flush_queue();
        }
    }

    /// Puts recovered messages back in the queue, in their original order.
    pub fn restore(&mut self, messages: Vec<OutboundMessage>) {
        if messages.is_empty() {
            return;
        }
        info!(count = messages.len(), "restoring unsent messages");
        let evicted = self.queue.extend(messages);
        self.report_drops(evicted, DropReason::Capacity);
        self.emit_queue_changed();
    }

    /// Updates the quality hint used to size handshake timeouts.
    pub fn set_network_quality(&mut self, quality: NetworkQuality) {
        self.quality = quality;
    }

    /// Runs one turn of the event loop: fire a due retry, open a pending
    /// socket, read available frames, flush the queue, expire old messages.
    pub fn poll(&mut self) {
        if let Some(timer) = self.retry_timer {
            if timer.is_due(self.clock.now()) {
                self.dispatch(Trigger::RetryDue);
            }
        }

        if self.open_pending && self.state == ConnectionState::Connecting {
            self.open_transport();
        }

        if self.is_connected() {
            self.receive_frames();
        }

        if self.is_connected() {
            self.flush_queue();
        }

        self.prune_expired();
    }

    /// Takes all events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<ConnectionEvent> {
        std::mem::take(&mut self.outbox)
    }

    // === State machine ===

    fn dispatch(&mut self, trigger: Trigger) {
        use ConnectionState::*;

        match (self.state, trigger) {
            (Disconnected, Trigger::Start) => self.begin_connecting(),
            (Disconnected | Reconnecting { .. } | Failed, Trigger::ManualReconnect) => {
                self.on_manual_reconnect()
            }
            (Connecting, Trigger::OpenSucceeded) => self.on_open_succeeded(),
            (Connecting, Trigger::OpenFailed(e)) => self.on_open_failed(e),
            (Connected, Trigger::ConnectionLost(e)) => self.on_connection_lost(e),
            (Reconnecting { .. }, Trigger::RetryDue) => self.on_retry_due(),
            (_, Trigger::Close) => self.on_close(),
            (state, trigger) => debug!(%state, ?trigger, "trigger ignored"),
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!(%from, %to, endpoint = %self.endpoint, "connection state changed");
        self.outbox.push(ConnectionEvent::StateChanged { from, to });
    }

    fn begin_connecting(&mut self) {
        self.cancel_retry();
        self.open_pending = true;
        self.transition(ConnectionState::Connecting);
    }

    fn on_manual_reconnect(&mut self) {
        info!(previous_attempts = self.attempt, "manual reconnect");
        self.attempt = 0;
        self.begin_connecting();
    }

    fn on_open_succeeded(&mut self) {
        self.attempt = 0;
        self.protocol_error_streak = 0;
        self.cancel_retry();
        self.transition(ConnectionState::Connected);
        self.flush_queue();
    }

    fn on_open_failed(&mut self, error: NetworkError) {
        warn!(%error, "connection attempt failed");
        self.schedule_retry_or_fail(error);
    }

    fn on_connection_lost(&mut self, error: NetworkError) {
        warn!(%error, "connection lost");
        self.schedule_retry_or_fail(error);
    }

    fn on_retry_due(&mut self) {
        self.retry_timer = None;
        self.open_pending = true;
        self.transition(ConnectionState::Connecting);
    }

    fn on_close(&mut self) {
        self.cancel_retry();
        self.open_pending = false;
        if self.transport.is_open() {
            let _ = self.transport.disconnect(); // Ignore disconnect errors
        }
        self.transition(ConnectionState::Disconnected);
    }

    fn schedule_retry_or_fail(&mut self, cause: NetworkError) {
        let _ = self.transport.disconnect();
        self.open_pending = false;
        self.cancel_retry();
        self.attempt = self.attempt.saturating_add(1);
        let now_ms = self.clock.unix_millis();

        if !self.policy.allows_attempt(self.attempt) {
            let retries = self.attempt - 1;
            warn!(retries, "giving up on connection");
            self.transition(ConnectionState::Failed);
            self.emit_error(ConnectionError::fatal(
                format!("Connection failed after {} retries: {}", retries, cause),
                now_ms,
            ));
            return;
        }

        let delay = self.policy.delay_for_attempt(self.attempt);
        let timer = RetryTimer::schedule(self.clock.now(), delay, self.attempt);
        self.retry_timer = Some(timer);
        info!(attempt = self.attempt, delay_ms = delay.as_millis() as u64, "retry scheduled");
        self.transition(ConnectionState::Reconnecting {
            attempt: self.attempt,
            delay_ms: delay.as_millis() as u64,
        });
        self.emit_error(ConnectionError::transient(cause.to_string(), now_ms));
    }

    fn cancel_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            debug!(attempt = timer.attempt, "pending retry cancelled");
        }
    }

    // === I/O ===

    fn open_transport(&mut self) {
        self.open_pending = false;
        let config = TransportConfig {
            handshake_timeout: self.effective_handshake_timeout(),
            ..self.transport_config.clone()
        };

        debug!(endpoint = %self.endpoint, timeout_ms = config.handshake_timeout.as_millis() as u64, "opening socket");
        match self.transport.connect(&self.endpoint, &config) {
            Ok(()) => self.dispatch(Trigger::OpenSucceeded),
            Err(e) => self.dispatch(Trigger::OpenFailed(e)),
        }
    }

    fn receive_frames(&mut self) {
        for _ in 0..MAX_FRAMES_PER_POLL {
            match self.transport.receive() {
                Ok(Some(frame)) => self.on_frame(&frame),
                Ok(None) => break,
                Err(e) if e.is_frame_error() => self.on_malformed_frame(e),
                Err(e) => {
                    self.dispatch(Trigger::ConnectionLost(e));
                    break;
                }
            }
        }
    }

    fn on_frame(&mut self, frame: &str) {
        match decode_message(frame, self.clock.unix_millis()) {
            Ok(message) => {
                self.protocol_error_streak = 0;
                debug!(kind = %message.kind, "frame received");
                self.outbox.push(ConnectionEvent::MessageReceived(message));
            }
            Err(e) => self.on_malformed_frame(e),
        }
    }

    fn on_malformed_frame(&mut self, error: NetworkError) {
        self.protocol_error_streak = self.protocol_error_streak.saturating_add(1);
        warn!(%error, streak = self.protocol_error_streak, "dropping malformed frame");
        self.emit_error(ConnectionError::protocol(
            format!("Dropped malformed frame: {}", error),
            self.clock.unix_millis(),
        ));

        if self.protocol_error_streak == self.protocol_error_threshold {
            warn!(consecutive = self.protocol_error_streak, "malformed frames keep arriving");
            self.outbox.push(ConnectionEvent::ProtocolErrorsEscalated {
                consecutive: self.protocol_error_streak,
            });
        }
    }

    fn flush_queue(&mut self) {
        let before = self.queue.size();

        while self.is_connected() && !self.queue.is_empty() {
            let ConnectionManager {
                queue, transport, ..
            } = self;
            let report = queue.flush(|message| {
                let frame = encode_message(message)?;
                transport.send(&frame)
            });

            for id in report.sent {
                debug!(%id, "message sent");
                self.outbox.push(ConnectionEvent::MessageSent { id });
            }

            match report.error {
                None => break,
                Some(e) if e.is_frame_error() => {
                    // The head message itself is bad; drop it and keep going
                    if let Some(bad) = self.queue.pop_front() {
                        self.emit_error(ConnectionError::protocol(
                            format!("Dropped unencodable message {}: {}", bad.id, e),
                            self.clock.unix_millis(),
                        ));
                        self.report_drops(vec![bad], DropReason::Unencodable);
                    }
                }
                Some(e) => {
                    self.dispatch(Trigger::ConnectionLost(e));
                    break;
                }
            }
        }

        if self.queue.size() != before {
            self.emit_queue_changed();
        }
    }

    fn prune_expired(&mut self) {
        let expired = self.queue.prune_expired(self.clock.unix_millis());
        if !expired.is_empty() {
            self.report_drops(expired, DropReason::Expired);
            self.emit_queue_changed();
        }
    }

    // === Events ===

    fn emit_error(&mut self, error: ConnectionError) {
        self.outbox.push(ConnectionEvent::Error(error));
    }

    fn emit_queue_changed(&mut self) {
        self.outbox.push(ConnectionEvent::QueueChanged {
            size: self.queue.size(),
        });
    }

    fn report_drops(&mut self, dropped: Vec<OutboundMessage>, reason: DropReason) {
        if dropped.is_empty() {
            return;
        }
        warn!(count = dropped.len(), ?reason, "discarding queued messages");
        self.outbox.push(ConnectionEvent::MessagesDropped {
            ids: dropped.into_iter().map(|m| m.id).collect(),
            reason,
        });
    }
}
