// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recovery Commands
//!
//! Inspect and clear unsent messages saved between runs.

use anyhow::Result;
use duelsync_core::SessionIdentity;
use tracing::debug;

use crate::config::CliConfig;
use crate::display;

/// Lists saved unsent messages.
pub fn pending(config: &CliConfig, game: &str, player: &str) -> Result<()> {
    let store = config.open_recovery()?;
    let identity = SessionIdentity::new(game, player);
    debug!(%identity, path = ?config.recovery_path(), "reading recovery record");

    let Some(snapshot) = store.try_load(&identity)? else {
        display::info(&format!("No unsent messages for {}", identity));
        return Ok(());
    };

    println!(
        "{} unsent message(s) for {} (saved at {})",
        snapshot.unsent_messages.len(),
        identity,
        snapshot.saved_at
    );
    for message in &snapshot.unsent_messages {
        println!(
            "  {}  {:<12}  {}",
            message.id,
            message.kind.as_str(),
            message.payload
        );
    }
    Ok(())
}

/// Deletes saved unsent messages.
pub fn clear(config: &CliConfig, game: &str, player: &str) -> Result<()> {
    let mut store = config.open_recovery()?;
    let identity = SessionIdentity::new(game, player);

    debug!(%identity, path = ?config.recovery_path(), "clearing recovery record");
    store.clear(&identity)?;
    display::success(&format!("Cleared unsent messages for {}", identity));
    Ok(())
}
