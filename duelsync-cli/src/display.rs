// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Terminal output helpers.

use console::style;
use duelsync_core::api::SessionEvent;
use duelsync_core::network::ConnectionErrorKind;

pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", style("→").cyan(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Prints the events a terminal user cares about.
pub fn session_event(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged { to, .. } => info(&format!("connection: {}", to)),
        SessionEvent::MessageReceived(message) => {
            println!("{} {} {}", style("←").magenta(), style(&message.kind).bold(), message.data);
        }
        SessionEvent::Restored { count } => {
            info(&format!("restored {} unsent message(s)", count));
        }
        SessionEvent::MessagesDropped { ids, reason } => {
            warning(&format!("dropped {} message(s): {:?}", ids.len(), reason));
        }
        SessionEvent::Error(e) if e.kind == ConnectionErrorKind::Fatal => error(&e.to_string()),
        SessionEvent::Error(e) => warning(&e.to_string()),
        SessionEvent::ProtocolErrorsEscalated { consecutive } => {
            error(&format!("server sent {} malformed frames in a row", consecutive));
        }
        _ => {}
    }
}
