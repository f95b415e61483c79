// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Leases
//!
//! At most one live session per identity. Two sessions for the same
//! participant would open two sockets and race on one recovery record.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use super::error::SessionError;
use crate::identity::SessionIdentity;

type ActiveSet = Arc<Mutex<HashSet<SessionIdentity>>>;

/// Registry of identities with a live session.
///
/// Clones share the same registry. [`SessionLeases::global`] is the
/// process-wide instance sessions use unless given another.
#[derive(Debug, Clone, Default)]
pub struct SessionLeases {
    active: ActiveSet,
}

impl SessionLeases {
    /// Creates an empty, independent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> SessionLeases {
        static GLOBAL: OnceLock<SessionLeases> = OnceLock::new();
        GLOBAL.get_or_init(SessionLeases::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SessionIdentity>> {
        lock_set(&self.active)
    }

    /// Claims `identity`, failing if another lease holds it.
    pub fn acquire(&self, identity: &SessionIdentity) -> Result<SessionLease, SessionError> {
        if !self.lock().insert(identity.clone()) {
            return Err(SessionError::AlreadyActive(identity.to_string()));
        }
        debug!(%identity, "session lease acquired");
        Ok(SessionLease {
            identity: identity.clone(),
            active: self.active.clone(),
        })
    }

    /// Returns true if a lease for `identity` is held.
    pub fn is_active(&self, identity: &SessionIdentity) -> bool {
        self.lock().contains(identity)
    }

    /// Number of held leases.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

/// Exclusive claim on an identity. Released on drop.
#[derive(Debug)]
pub struct SessionLease {
    identity: SessionIdentity,
    active: ActiveSet,
}

impl SessionLease {
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        lock_set(&self.active).remove(&self.identity);
        debug!(identity = %self.identity, "session lease released");
    }
}

fn lock_set(set: &ActiveSet) -> MutexGuard<'_, HashSet<SessionIdentity>> {
    set.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let leases = SessionLeases::new();
        let identity = SessionIdentity::new("g1", "alice");

        let lease = leases.acquire(&identity).unwrap();
        assert!(matches!(
            leases.acquire(&identity),
            Err(SessionError::AlreadyActive(_))
        ));

        drop(lease);
        assert!(!leases.is_active(&identity));
        assert!(leases.acquire(&identity).is_ok());
    }

    #[test]
    fn test_distinct_identities_coexist() {
        let leases = SessionLeases::new();
        let _alice = leases.acquire(&SessionIdentity::new("g1", "alice")).unwrap();
        let _bob = leases.acquire(&SessionIdentity::new("g1", "bob")).unwrap();
        assert_eq!(leases.active_count(), 2);
    }
}
