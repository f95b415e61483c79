// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for session events.

use std::sync::Arc;

use crate::network::{
    ConnectionError, ConnectionEvent, ConnectionState, DropReason, InboundMessage, MessageId,
    NetworkTransition,
};

/// Events emitted by a [`DuelSession`](super::DuelSession).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Connection state changed.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// A message arrived from the server.
    MessageReceived(InboundMessage),

    /// A queued message was handed to the socket.
    MessageSent {
        /// The message ID returned when it was queued.
        id: MessageId,
    },

    /// The outbound queue changed size.
    QueueChanged { size: usize },

    /// Queued messages were discarded without being sent.
    MessagesDropped {
        ids: Vec<MessageId>,
        reason: DropReason,
    },

    /// An error for the error channel.
    Error(ConnectionError),

    /// Malformed frames keep arriving.
    ProtocolErrorsEscalated { consecutive: u32 },

    /// Connectivity or link quality changed.
    NetworkChanged(NetworkTransition),

    /// Unsent messages from a previous run were put back in the queue.
    Restored { count: usize },
}

impl From<ConnectionEvent> for SessionEvent {
    fn from(event: ConnectionEvent) -> Self {
        match event {
            ConnectionEvent::StateChanged { from, to } => SessionEvent::StateChanged { from, to },
            ConnectionEvent::MessageReceived(message) => SessionEvent::MessageReceived(message),
            ConnectionEvent::MessageSent { id } => SessionEvent::MessageSent { id },
            ConnectionEvent::QueueChanged { size } => SessionEvent::QueueChanged { size },
            ConnectionEvent::MessagesDropped { ids, reason } => {
                SessionEvent::MessagesDropped { ids, reason }
            }
            ConnectionEvent::Error(error) => SessionEvent::Error(error),
            ConnectionEvent::ProtocolErrorsEscalated { consecutive } => {
                SessionEvent::ProtocolErrorsEscalated { consecutive }
            }
        }
    }
}

/// Event handler trait.
///
/// Implement this trait to receive session events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: SessionEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: SessionEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: SessionEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_dispatcher_reaches_every_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();

        for tag in ["a", "b"] {
            let seen = seen.clone();
            dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
                if let SessionEvent::QueueChanged { size } = event {
                    seen.lock().unwrap().push(format!("{}:{}", tag, size));
                }
            })));
        }

        dispatcher.dispatch(SessionEvent::QueueChanged { size: 2 });
        assert_eq!(*seen.lock().unwrap(), vec!["a:2", "b:2"]);

        dispatcher.clear_handlers();
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[test]
    fn test_connection_event_conversion() {
        let event: SessionEvent = ConnectionEvent::StateChanged {
            from: ConnectionState::Connecting,
            to: ConnectionState::Connected,
        }
        .into();
        assert_eq!(
            event,
            SessionEvent::StateChanged {
                from: ConnectionState::Connecting,
                to: ConnectionState::Connected,
            }
        );
    }
}
