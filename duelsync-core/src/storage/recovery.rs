// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recovery snapshots.
//!
//! A snapshot is the ordered list of unsent messages for one session
//! identity. At most one snapshot exists per identity; saving replaces it
//! and an empty queue removes it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{MemoryRecoveryBackend, RecoveryBackend, RecoveryError, StorageError};
use crate::identity::SessionIdentity;
use crate::network::OutboundMessage;

/// Current snapshot record format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted state for one session identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySnapshot {
    /// Record format version.
    pub version: u32,
    pub identity: SessionIdentity,
    /// Unsent messages, oldest first.
    pub unsent_messages: Vec<OutboundMessage>,
    /// Unix timestamp (milliseconds) of the save.
    pub saved_at: u64,
}

impl RecoverySnapshot {
    pub fn new(identity: SessionIdentity, unsent_messages: Vec<OutboundMessage>, saved_at: u64) -> Self {
        RecoverySnapshot {
            version: SNAPSHOT_VERSION,
            identity,
            unsent_messages,
            saved_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unsent_messages.is_empty()
    }
}

/// Saves and restores recovery snapshots over a [`RecoveryBackend`].
pub struct RecoveryStore {
    backend: Box<dyn RecoveryBackend>,
}

impl RecoveryStore {
    /// Creates a store over the given backend.
    pub fn new(backend: impl RecoveryBackend + 'static) -> Self {
        RecoveryStore {
            backend: Box::new(backend),
        }
    }

    /// Creates a store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(MemoryRecoveryBackend::new())
    }

    /// Replaces the identity's snapshot with `messages`.
    ///
    /// An empty list removes the record instead of storing an empty one.
    pub fn save(
        &mut self,
        identity: &SessionIdentity,
        messages: &[OutboundMessage],
        saved_at: u64,
    ) -> Result<(), RecoveryError> {
        let key = identity.recovery_key();
        if messages.is_empty() {
            debug!(%identity, "queue empty, removing recovery record");
            self.backend.remove(&key)?;
            return Ok(());
        }

        let snapshot = RecoverySnapshot::new(identity.clone(), messages.to_vec(), saved_at);
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.write(&key, &json)?;
        debug!(%identity, count = messages.len(), "recovery snapshot saved");
        Ok(())
    }

    /// Reads the identity's snapshot, reporting why an unusable record
    /// could not be read.
    pub fn try_load(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<RecoverySnapshot>, RecoveryError> {
        let Some(raw) = self.backend.read(&identity.recovery_key())? else {
            return Ok(None);
        };

        let snapshot: RecoverySnapshot =
            serde_json::from_str(&raw).map_err(|e| RecoveryError::Malformed(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RecoveryError::UnsupportedVersion(snapshot.version));
        }
        if &snapshot.identity != identity {
            return Err(RecoveryError::IdentityMismatch {
                expected: identity.to_string(),
                found: snapshot.identity.to_string(),
            });
        }

        Ok(Some(snapshot))
    }

    /// Reads the identity's snapshot, treating unusable records as absent.
    ///
    /// A record that cannot be parsed is removed so it does not fail every
    /// subsequent start. Backend errors leave the record in place.
    pub fn load(&mut self, identity: &SessionIdentity) -> Option<RecoverySnapshot> {
        match self.try_load(identity) {
            Ok(snapshot) => snapshot,
            Err(RecoveryError::Storage(e)) => {
                warn!(%identity, error = %e, "recovery backend read failed");
                None
            }
            Err(e) => {
                warn!(%identity, error = %e, "discarding unusable recovery record");
                if let Err(remove_err) = self.backend.remove(&identity.recovery_key()) {
                    warn!(%identity, error = %remove_err, "failed to remove recovery record");
                }
                None
            }
        }
    }

    /// Removes the identity's snapshot.
    pub fn clear(&mut self, identity: &SessionIdentity) -> Result<(), RecoveryError> {
        self.backend.remove(&identity.recovery_key())?;
        Ok(())
    }
}

impl Default for RecoveryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
