// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use duelsync_core::network::ReconnectPolicy;
use duelsync_core::storage::{RecoveryStore, SqliteRecoveryBackend};
use duelsync_core::SessionConfig;

/// Reconnect and timeout flags, mirroring the library's environment
/// variables.
#[derive(Args, Debug, Clone)]
pub struct ReconnectArgs {
    /// Retries after a failure before giving up
    #[arg(long, global = true, env = "DUELSYNC_MAX_ATTEMPTS", default_value_t = 10)]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, global = true, env = "DUELSYNC_INITIAL_DELAY_MS", default_value_t = 500)]
    pub initial_delay_ms: u64,

    /// Cap on the retry delay, in milliseconds
    #[arg(long, global = true, env = "DUELSYNC_MAX_DELAY_MS", default_value_t = 30_000)]
    pub max_delay_ms: u64,

    /// Growth factor between retries
    #[arg(long, global = true, env = "DUELSYNC_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    pub backoff_multiplier: f64,

    /// Time allowed for TCP connect plus WebSocket handshake, in milliseconds.
    /// Must be shorter than the initial delay.
    #[arg(long, global = true, env = "DUELSYNC_HANDSHAKE_TIMEOUT_MS", default_value_t = 300)]
    pub handshake_timeout_ms: u64,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Data directory for storage.
    pub data_dir: PathBuf,
    /// Match server base URL.
    pub server_url: String,
    pub reconnect: ReconnectArgs,
}

impl CliConfig {
    /// Returns the path of the recovery database.
    pub fn recovery_path(&self) -> PathBuf {
        self.data_dir.join("recovery.db")
    }

    /// Opens (creating if needed) the recovery store.
    pub fn open_recovery(&self) -> Result<RecoveryStore> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {:?}", self.data_dir))?;
        let backend = SqliteRecoveryBackend::open(self.recovery_path())?;
        Ok(RecoveryStore::new(backend))
    }

    /// Builds and validates the session configuration.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let args = &self.reconnect;
        let policy = ReconnectPolicy::from_millis(
            args.max_attempts,
            args.initial_delay_ms,
            args.max_delay_ms,
            args.backoff_multiplier,
        )?;

        let config = SessionConfig::new(self.server_url.clone())
            .with_reconnect_policy(policy)
            .with_handshake_timeout(Duration::from_millis(args.handshake_timeout_ms));
        config.validate()?;
        Ok(config)
    }
}
