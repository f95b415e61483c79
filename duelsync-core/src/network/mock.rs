// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory implementation of the Transport trait for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use url::Url;

use super::error::NetworkError;
use super::transport::{Transport, TransportConfig, TransportResult};

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    /// URLs passed to every connect() call, successful or not.
    connect_attempts: Vec<String>,
    /// Remaining connect() calls that should fail.
    failing_connects: usize,
    /// Fail every connect() until cleared.
    refuse_connections: bool,
    /// Frames successfully sent.
    sent: Vec<String>,
    /// Remaining send() calls that should fail.
    failing_sends: usize,
    /// Frames handed out by receive(), in order.
    incoming: VecDeque<Incoming>,
    disconnects: usize,
}

#[derive(Debug)]
enum Incoming {
    Frame(String),
    NonText,
    Close,
}

/// Mock transport for testing.
///
/// Clones share state, so a test keeps one handle while the connection
/// manager owns another.
///
/// # Example
///
/// ```
/// use duelsync_core::network::{MockTransport, Transport, TransportConfig};
///
/// let mut transport = MockTransport::new();
/// let handle = transport.clone();
///
/// let url = url::Url::parse("ws://localhost/ws/g/p").unwrap();
/// transport.connect(&url, &TransportConfig::default()).unwrap();
/// transport.send(r#"{"type":"test","data":{}}"#).unwrap();
///
/// assert_eq!(handle.sent_frames().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes the next `count` connect() calls fail.
    pub fn fail_next_connects(&self, count: usize) {
        self.lock().failing_connects = count;
    }

    /// Makes every connect() fail until called again with `false`.
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    /// Makes the next `count` send() calls fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.lock().failing_sends = count;
    }

    /// Queues a text frame to be returned by receive().
    pub fn queue_receive(&self, frame: impl Into<String>) {
        self.lock().incoming.push_back(Incoming::Frame(frame.into()));
    }

    /// Queues a frame that is not text (e.g. non-UTF-8 binary).
    pub fn queue_non_text(&self) {
        self.lock().incoming.push_back(Incoming::NonText);
    }

    /// Simulates the server closing the socket after any queued frames.
    pub fn close_remotely(&self) {
        self.lock().incoming.push_back(Incoming::Close);
    }

    /// Returns all frames that have been sent.
    pub fn sent_frames(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Returns the `type` field of every sent frame.
    pub fn sent_types(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter_map(|frame| serde_json::from_str::<serde_json::Value>(frame).ok())
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect()
    }

    /// Clears the sent frames buffer.
    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// Number of connect() calls so far.
    pub fn connect_count(&self) -> usize {
        self.lock().connect_attempts.len()
    }

    /// URLs of all connect() calls so far.
    pub fn connect_urls(&self) -> Vec<String> {
        self.lock().connect_attempts.clone()
    }

    /// Number of disconnect() calls so far.
    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    /// Number of frames waiting to be received.
    pub fn receive_queue_len(&self) -> usize {
        self.lock().incoming.len()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, url: &Url, _config: &TransportConfig) -> TransportResult<()> {
        let mut state = self.lock();
        state.connect_attempts.push(url.to_string());

        if state.refuse_connections {
            return Err(NetworkError::ConnectionFailed("connection refused".into()));
        }
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(NetworkError::ConnectionFailed("connection refused".into()));
        }

        state.open = true;
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        let mut state = self.lock();
        state.open = false;
        state.disconnects += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn send(&mut self, frame: &str) -> TransportResult<()> {
        let mut state = self.lock();

        if !state.open {
            return Err(NetworkError::NotConnected);
        }
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(NetworkError::SendFailed("broken pipe".into()));
        }

        state.sent.push(frame.to_string());
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<String>> {
        let mut state = self.lock();

        if !state.open {
            return Err(NetworkError::NotConnected);
        }

        match state.incoming.pop_front() {
            Some(Incoming::Frame(frame)) => Ok(Some(frame)),
            Some(Incoming::NonText) => Err(NetworkError::InvalidMessage(
                "Binary frame is not valid UTF-8".into(),
            )),
            Some(Incoming::Close) => {
                state.open = false;
                Err(NetworkError::ConnectionClosed)
            }
            None => Ok(None),
        }
    }
}
