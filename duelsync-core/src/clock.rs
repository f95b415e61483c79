// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Time Sources
//!
//! Everything that waits (backoff timers, message TTLs) reads time through
//! [`Clock`] so tests can step time by hand.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic time, used for timers.
    fn now(&self) -> Instant;

    /// Wall-clock time as Unix milliseconds, used for timestamps that get
    /// persisted or shown to users.
    fn unix_millis(&self) -> u64;
}

/// Returns the current Unix timestamp in milliseconds.
/// Falls back to 0 if the system clock is before UNIX_EPOCH.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Clones share the same elapsed offset, so a test can keep one handle and
/// give another to the session under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    origin_unix_ms: u64,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        ManualClock {
            origin: Instant::now(),
            origin_unix_ms: current_timestamp_ms(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    /// Moves time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn unix_millis(&self) -> u64 {
        self.origin_unix_ms + self.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let start = clock.now();
        let start_ms = clock.unix_millis();

        handle.advance_ms(1_500);

        assert_eq!(clock.now() - start, Duration::from_millis(1_500));
        assert_eq!(clock.unix_millis() - start_ms, 1_500);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(clock.unix_millis() > 0);
    }
}
