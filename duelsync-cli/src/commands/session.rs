// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Commands
//!
//! Commands that hold a live connection to the match server.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use duelsync_core::api::{CallbackHandler, DuelSession};
use duelsync_core::network::{ConnectionState, WebSocketTransport};
use duelsync_core::SessionIdentity;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::display;

/// Longest sleep between polls while not connected.
const IDLE_POLL: Duration = Duration::from_millis(100);

fn open_session(
    config: &CliConfig,
    game: &str,
    player: &str,
) -> Result<DuelSession<WebSocketTransport>> {
    let identity = SessionIdentity::new(game, player);
    info!(%identity, server = %config.server_url, recovery = ?config.recovery_path(), "opening session");
    let session = DuelSession::builder(identity, WebSocketTransport::new())
        .config(config.session_config()?)
        .recovery(config.open_recovery()?)
        .subscribe(Arc::new(CallbackHandler::new(|event| {
            display::session_event(&event)
        })))
        .build()?;
    Ok(session)
}

/// Sleeps until the next scheduled work while disconnected. A connected
/// poll already blocks on the socket's read timeout.
fn idle(session: &DuelSession<WebSocketTransport>) {
    if session.connection_state() == ConnectionState::Connected {
        return;
    }
    let wait = session.next_wakeup().unwrap_or(IDLE_POLL).min(IDLE_POLL);
    if !wait.is_zero() {
        thread::sleep(wait);
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Runs a session until stdin closes.
pub fn connect(config: &CliConfig, game: &str, player: &str) -> Result<()> {
    let mut session = open_session(config, game, player)?;
    display::info(&format!(
        "session {} on {} (type lines to send, Ctrl-D to quit)",
        session.identity(),
        config.server_url
    ));

    let lines = spawn_stdin_reader();
    loop {
        session.poll();

        match lines.try_recv() {
            Ok(line) if !line.trim().is_empty() => {
                if let Some(id) = session.send_message("test", json!({ "text": line })) {
                    debug!(%id, "queued line from stdin");
                }
            }
            Ok(_) | Err(TryRecvError::Empty) => idle(&session),
            Err(TryRecvError::Disconnected) => break,
        }
    }

    let pending = session.message_queue_size();
    session.dispose();
    info!(pending, "stdin closed, session disposed");
    if pending > 0 {
        display::warning(&format!("{} unsent message(s) kept for the next run", pending));
    }
    Ok(())
}

/// Queues a proof and waits until the queue drains, the connection gives
/// up, or the timeout passes.
pub fn submit_proof(
    config: &CliConfig,
    game: &str,
    player: &str,
    round: &str,
    proof: &str,
    timeout_secs: u64,
) -> Result<()> {
    let mut session = open_session(config, game, player)?;
    let id = session
        .submit_proof(game, round, proof)
        .context("Proof was not queued")?;

    debug!(%id, timeout_secs, "waiting for proof to flush");
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    while session.message_queue_size() > 0
        && session.connection_state() != ConnectionState::Failed
        && Instant::now() < deadline
    {
        session.poll();
        idle(&session);
    }

    let pending = session.message_queue_size();
    let state = session.connection_state();
    session.dispose();
    info!(%id, pending, %state, "proof submission finished");

    if pending == 0 {
        display::success(&format!("Proof {} sent", id));
    } else {
        display::warning(&format!(
            "Proof not sent yet; {} message(s) kept for the next run",
            pending
        ));
    }
    Ok(())
}
