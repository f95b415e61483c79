// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconnect Policy
//!
//! Exponential backoff between reconnect attempts.

use std::time::Duration;

use thiserror::Error;

/// Invalid reconnect policy parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Initial delay must be greater than zero")]
    ZeroInitialDelay,

    #[error("Max delay ({max_ms}ms) is below initial delay ({initial_ms}ms)")]
    MaxBelowInitial { initial_ms: u64, max_ms: u64 },

    #[error("Backoff multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),
}

/// Backoff schedule for reconnect attempts.
///
/// The delay before attempt `n` (1-indexed) is
/// `min(max_delay, initial_delay * backoff_multiplier^(n-1))`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Creates a validated policy.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, PolicyError> {
        if initial_delay.is_zero() {
            return Err(PolicyError::ZeroInitialDelay);
        }
        if max_delay < initial_delay {
            return Err(PolicyError::MaxBelowInitial {
                initial_ms: initial_delay.as_millis() as u64,
                max_ms: max_delay.as_millis() as u64,
            });
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(backoff_multiplier));
        }

        Ok(ReconnectPolicy {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        })
    }

    /// Convenience constructor taking milliseconds.
    pub fn from_millis(
        max_attempts: u32,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        backoff_multiplier: f64,
    ) -> Result<Self, PolicyError> {
        Self::new(
            max_attempts,
            Duration::from_millis(initial_delay_ms),
            Duration::from_millis(max_delay_ms),
            backoff_multiplier,
        )
    }

    /// Number of retries allowed after a failure before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Returns true if retry number `attempt` (1-indexed) may be scheduled.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Delay before retry number `attempt` (1-indexed). Attempt 0 is
    /// treated as attempt 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let initial_ms = self.initial_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        // powi overflows to infinity for large exponents, which min() caps
        let raw_ms = initial_ms * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(raw_ms.min(max_ms).round() as u64)
    }
}
