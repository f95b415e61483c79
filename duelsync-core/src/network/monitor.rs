// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Monitor
//!
//! Tracks host connectivity signals and reports when they actually change.
//! Holds no socket and no retry state.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A connectivity signal from the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSignal {
    /// The host reports network access.
    Online,
    /// The host reports no network access.
    Offline,
    /// Effective connection type hint (`slow-2g`, `2g`, `3g`, `4g`).
    ConnectionType(String),
}

/// Coarse connection quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkQuality {
    Slow,
    Moderate,
    Fast,
    /// No hint available.
    #[default]
    Unknown,
}

impl NetworkQuality {
    /// Classifies an effective-connection-type hint.
    pub fn from_effective_type(hint: &str) -> Self {
        match hint.trim().to_ascii_lowercase().as_str() {
            "slow-2g" | "2g" => NetworkQuality::Slow,
            "3g" => NetworkQuality::Moderate,
            "4g" | "5g" | "wifi" | "ethernet" => NetworkQuality::Fast,
            _ => NetworkQuality::Unknown,
        }
    }

    /// How much longer than normal a handshake may take on this link.
    pub fn handshake_timeout_factor(&self) -> u32 {
        match self {
            NetworkQuality::Slow => 3,
            NetworkQuality::Moderate => 2,
            NetworkQuality::Fast | NetworkQuality::Unknown => 1,
        }
    }
}

/// A change in observed connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTransition {
    WentOnline,
    WentOffline,
    QualityChanged {
        from: NetworkQuality,
        to: NetworkQuality,
    },
}

/// Observer of host connectivity.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    online: bool,
    quality: NetworkQuality,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial connectivity.
    pub fn new(online: bool) -> Self {
        NetworkMonitor {
            online,
            quality: NetworkQuality::Unknown,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn quality(&self) -> NetworkQuality {
        self.quality
    }

    /// Records a signal, returning a transition only if something changed.
    pub fn observe(&mut self, signal: NetworkSignal) -> Option<NetworkTransition> {
        let transition = match signal {
            NetworkSignal::Online if !self.online => {
                self.online = true;
                Some(NetworkTransition::WentOnline)
            }
            NetworkSignal::Offline if self.online => {
                self.online = false;
                Some(NetworkTransition::WentOffline)
            }
            NetworkSignal::ConnectionType(hint) => {
                let quality = NetworkQuality::from_effective_type(&hint);
                if quality == self.quality {
                    None
                } else {
                    let from = std::mem::replace(&mut self.quality, quality);
                    Some(NetworkTransition::QualityChanged { from, to: quality })
                }
            }
            NetworkSignal::Online | NetworkSignal::Offline => None,
        };

        if let Some(ref t) = transition {
            debug!(transition = ?t, "network transition");
        }
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_signals_are_deduplicated() {
        let mut monitor = NetworkMonitor::new(true);

        assert_eq!(monitor.observe(NetworkSignal::Online), None);
        assert_eq!(
            monitor.observe(NetworkSignal::Offline),
            Some(NetworkTransition::WentOffline)
        );
        assert_eq!(monitor.observe(NetworkSignal::Offline), None);
        assert_eq!(
            monitor.observe(NetworkSignal::Online),
            Some(NetworkTransition::WentOnline)
        );
        assert_eq!(monitor.observe(NetworkSignal::Online), None);
    }

    #[test]
    fn test_quality_transitions() {
        let mut monitor = NetworkMonitor::default();

        assert_eq!(
            monitor.observe(NetworkSignal::ConnectionType("2g".into())),
            Some(NetworkTransition::QualityChanged {
                from: NetworkQuality::Unknown,
                to: NetworkQuality::Slow,
            })
        );
        assert_eq!(
            monitor.observe(NetworkSignal::ConnectionType("slow-2g".into())),
            None
        );
        assert_eq!(monitor.quality(), NetworkQuality::Slow);
    }

    #[test]
    fn test_quality_does_not_touch_online_flag() {
        let mut monitor = NetworkMonitor::new(false);
        monitor.observe(NetworkSignal::ConnectionType("4g".into()));
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_effective_type_classification() {
        assert_eq!(
            NetworkQuality::from_effective_type("3G"),
            NetworkQuality::Moderate
        );
        assert_eq!(
            NetworkQuality::from_effective_type("4g"),
            NetworkQuality::Fast
        );
        assert_eq!(
            NetworkQuality::from_effective_type("carrier-pigeon"),
            NetworkQuality::Unknown
        );
        assert_eq!(NetworkQuality::Slow.handshake_timeout_factor(), 3);
    }
}
