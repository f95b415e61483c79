// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Configuration
//!
//! Everything a [`DuelSession`](super::DuelSession) needs to know that is not
//! its identity: where the server lives, how hard to retry, and how much to
//! buffer.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::network::{PolicyError, QueueLimits, ReconnectPolicy, TransportConfig};

/// Environment variable holding the server base URL.
pub const ENV_SERVER_URL: &str = "DUELSYNC_SERVER_URL";
pub const ENV_MAX_ATTEMPTS: &str = "DUELSYNC_MAX_ATTEMPTS";
pub const ENV_INITIAL_DELAY_MS: &str = "DUELSYNC_INITIAL_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "DUELSYNC_MAX_DELAY_MS";
pub const ENV_BACKOFF_MULTIPLIER: &str = "DUELSYNC_BACKOFF_MULTIPLIER";
pub const ENV_HANDSHAKE_TIMEOUT_MS: &str = "DUELSYNC_HANDSHAKE_TIMEOUT_MS";

/// Default number of inbound messages kept in session history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("server URL is not configured (set DUELSYNC_SERVER_URL)")]
    MissingServerUrl,

    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {0}, expected ws or wss")]
    UnsupportedScheme(String),

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid reconnect policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// WebSocket base URL; the identity's segments are appended to it.
    pub server_url: String,
    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,
    /// Upper bound for TCP connect plus the WebSocket handshake.
    pub handshake_timeout: Duration,
    /// How long one poll may block waiting for inbound frames.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Retention limits for unsent messages.
    pub queue_limits: QueueLimits,
    /// Number of inbound messages kept for [`messages`](super::DuelSession::messages).
    pub history_capacity: usize,
    /// Consecutive malformed frames before escalation.
    pub protocol_error_threshold: u32,
    /// Start connecting as soon as the session is built.
    pub auto_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        SessionConfig {
            server_url: String::new(),
            reconnect: ReconnectPolicy::default(),
            handshake_timeout: transport.handshake_timeout,
            read_timeout: transport.read_timeout,
            write_timeout: transport.write_timeout,
            queue_limits: QueueLimits::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            protocol_error_threshold: crate::network::DEFAULT_PROTOCOL_ERROR_THRESHOLD,
            auto_connect: true,
        }
    }
}

impl SessionConfig {
    /// Creates a default configuration pointing at `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        SessionConfig {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Reads configuration from `DUELSYNC_*` environment variables.
    ///
    /// Unset variables keep their defaults, except the server URL, which
    /// has none.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SessionConfig::default();
        let defaults = &config.reconnect;

        if let Some(url) = lookup(ENV_SERVER_URL) {
            config.server_url = url.trim().to_string();
        }

        let max_attempts = parse_var(&lookup, ENV_MAX_ATTEMPTS)?.unwrap_or(defaults.max_attempts());
        let initial_ms = parse_var(&lookup, ENV_INITIAL_DELAY_MS)?
            .unwrap_or(defaults.initial_delay().as_millis() as u64);
        let max_ms = parse_var(&lookup, ENV_MAX_DELAY_MS)?
            .unwrap_or(defaults.max_delay().as_millis() as u64);
        let multiplier =
            parse_var(&lookup, ENV_BACKOFF_MULTIPLIER)?.unwrap_or(defaults.backoff_multiplier());
        config.reconnect = ReconnectPolicy::from_millis(max_attempts, initial_ms, max_ms, multiplier)?;

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_HANDSHAKE_TIMEOUT_MS)? {
            config.handshake_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_queue_limits(mut self, limits: QueueLimits) -> Self {
        self.queue_limits = limits;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_protocol_error_threshold(mut self, threshold: u32) -> Self {
        self.protocol_error_threshold = threshold;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Checks the configuration for values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_base()?;

        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::Invalid("handshake timeout must be positive".into()));
        }
        if self.handshake_timeout >= self.reconnect.initial_delay() {
            return Err(ConfigError::Invalid(format!(
                "handshake timeout {}ms must be shorter than the initial reconnect delay {}ms",
                self.handshake_timeout.as_millis(),
                self.reconnect.initial_delay().as_millis()
            )));
        }
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(ConfigError::Invalid("read and write timeouts must be positive".into()));
        }
        if self.queue_limits.max_messages == Some(0) {
            return Err(ConfigError::Invalid("queue capacity must be positive".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history capacity must be positive".into()));
        }
        if self.protocol_error_threshold == 0 {
            return Err(ConfigError::Invalid(
                "protocol error threshold must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parses and checks the server base URL.
    pub fn endpoint_base(&self) -> Result<Url, ConfigError> {
        let raw = self.server_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }

        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: "URL cannot take path segments".into(),
            });
        }
        Ok(url)
    }

    /// Transport timeouts derived from this configuration.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            handshake_timeout: self.handshake_timeout,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            var,
            value: value.clone(),
            reason: e.to_string(),
        })
}
