// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Outbound Message Queue
//!
//! FIFO buffer of messages waiting for a live connection.

use std::collections::VecDeque;
use std::time::Duration;

use super::message::{MessageId, OutboundMessage};

/// Default maximum number of queued messages.
pub const DEFAULT_MAX_QUEUED_MESSAGES: usize = 1000;

/// Retention limits for unsent messages.
///
/// Both limits evict from the head (oldest first) and report what they
/// evicted; nothing leaves the queue unannounced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    /// Maximum number of queued messages, `None` for unbounded.
    pub max_messages: Option<usize>,
    /// Maximum time a message may wait, `None` to keep it until sent.
    pub max_age: Option<Duration>,
}

impl Default for QueueLimits {
    fn default() -> Self {
        QueueLimits {
            max_messages: Some(DEFAULT_MAX_QUEUED_MESSAGES),
            max_age: None,
        }
    }
}

impl QueueLimits {
    /// No count or age limit.
    pub fn unbounded() -> Self {
        QueueLimits {
            max_messages: None,
            max_age: None,
        }
    }
}

/// Result of a flush.
#[derive(Debug)]
pub struct FlushReport<E> {
    /// IDs of messages handed to the transport, in order.
    pub sent: Vec<MessageId>,
    /// The error that halted the flush, if any. The failing message is
    /// back at the head of the queue.
    pub error: Option<E>,
}

impl<E> FlushReport<E> {
    /// Returns true if the queue was drained without error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered buffer of outbound messages.
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    messages: VecDeque<OutboundMessage>,
    limits: QueueLimits,
}

impl MessageQueue {
    /// Creates an empty queue with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with the given limits.
    pub fn with_limits(limits: QueueLimits) -> Self {
        MessageQueue {
            messages: VecDeque::new(),
            limits,
        }
    }

    pub fn limits(&self) -> QueueLimits {
        self.limits
    }

    /// Appends a message to the tail.
    ///
    /// Always accepts the message. If that pushes the queue over
    /// `max_messages`, the oldest entries are evicted and returned.
    pub fn enqueue(&mut self, message: OutboundMessage) -> Vec<OutboundMessage> {
        self.messages.push_back(message);
        self.enforce_capacity()
    }

    /// Appends several messages in order.
    pub fn extend<I>(&mut self, messages: I) -> Vec<OutboundMessage>
    where
        I: IntoIterator<Item = OutboundMessage>,
    {
        self.messages.extend(messages);
        self.enforce_capacity()
    }

    /// Sends from the head until empty or `send` fails.
    ///
    /// On failure the message goes back to the head, preserving order, and
    /// flushing stops.
    pub fn flush<E, F>(&mut self, mut send: F) -> FlushReport<E>
    where
        F: FnMut(&OutboundMessage) -> Result<(), E>,
    {
        let mut sent = Vec::new();

        while let Some(message) = self.messages.pop_front() {
            match send(&message) {
                Ok(()) => sent.push(message.id),
                Err(e) => {
                    self.messages.push_front(message);
                    return FlushReport {
                        sent,
                        error: Some(e),
                    };
                }
            }
        }

        FlushReport { sent, error: None }
    }

    /// Removes and returns the head message.
    pub fn pop_front(&mut self) -> Option<OutboundMessage> {
        self.messages.pop_front()
    }

    /// Evicts messages older than `max_age` relative to `now_ms`.
    pub fn prune_expired(&mut self, now_ms: u64) -> Vec<OutboundMessage> {
        let Some(max_age) = self.limits.max_age else {
            return Vec::new();
        };
        let max_age_ms = max_age.as_millis() as u64;

        let (expired, kept): (VecDeque<_>, VecDeque<_>) = self
            .messages
            .drain(..)
            .partition(|m| now_ms.saturating_sub(m.enqueued_at) > max_age_ms);
        self.messages = kept;
        expired.into()
    }

    /// Number of pending messages.
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates pending messages from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.messages.iter()
    }

    /// Copies pending messages in order.
    pub fn snapshot(&self) -> Vec<OutboundMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Drops everything.
    pub fn clear(&mut self) -> Vec<OutboundMessage> {
        self.messages.drain(..).collect()
    }

    fn enforce_capacity(&mut self) -> Vec<OutboundMessage> {
        let Some(max) = self.limits.max_messages else {
            return Vec::new();
        };
        let excess = self.messages.len().saturating_sub(max);
        self.messages.drain(..excess).collect()
    }
}
