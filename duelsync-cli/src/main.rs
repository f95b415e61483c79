// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Duelsync CLI
//!
//! Command-line interface for Duelsync - keeps a duel connection alive from
//! a terminal.

mod commands;
mod config;
mod display;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use config::{CliConfig, ReconnectArgs};

#[derive(Parser)]
#[command(name = "duelsync")]
#[command(version, about = "Resilient real-time duel session client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (default: platform data dir + /duelsync)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Match server WebSocket base URL
    #[arg(long, global = true, env = "DUELSYNC_SERVER_URL", default_value = "")]
    server: String,

    #[command(flatten)]
    reconnect: ReconnectArgs,
}

/// Which participant in which duel.
#[derive(Args)]
struct IdentityArgs {
    /// Duel (game) ID
    game: String,

    /// Participant ID
    player: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and stay connected; stdin lines are sent as test messages
    Connect {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Submit a proof for a round and wait until it is sent
    SubmitProof {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Round ID
        round: String,

        /// Proof text
        proof: String,

        /// Give up waiting after this many seconds (the proof stays queued)
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },

    /// Show unsent messages saved for a participant
    Pending {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Delete unsent messages saved for a participant
    Clear {
        #[command(flatten)]
        identity: IdentityArgs,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("duelsync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Resolve data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duelsync")
    });

    let config = CliConfig {
        data_dir,
        server_url: cli.server,
        reconnect: cli.reconnect,
    };

    match cli.command {
        Commands::Connect { identity } => {
            commands::session::connect(&config, &identity.game, &identity.player)?;
        }
        Commands::SubmitProof {
            identity,
            round,
            proof,
            timeout_secs,
        } => {
            commands::session::submit_proof(
                &config,
                &identity.game,
                &identity.player,
                &round,
                &proof,
                timeout_secs,
            )?;
        }
        Commands::Pending { identity } => {
            commands::recovery::pending(&config, &identity.game, &identity.player)?;
        }
        Commands::Clear { identity } => {
            commands::recovery::clear(&config, &identity.game, &identity.player)?;
        }
    }

    Ok(())
}
