// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory recovery backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RecoveryBackend, StorageError};

/// Recovery backend backed by a shared `HashMap`.
///
/// Clones share the same map, which lets a test drop one session and
/// restore a new one from the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecoveryBackend {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryRecoveryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Raw record under `key`, bypassing snapshot parsing.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Writes a raw record, bypassing snapshot encoding.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }
}

impl RecoveryBackend for MemoryRecoveryBackend {
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
