//! Keyboard command input.
//!
//! A background thread reads stdin line by line, parses each line as a
//! [`SessionCommand`] and pushes it into the session's command channel.
//! Unrecognized input is dropped with a debug log. The thread is
//! daemon-style: it ends when stdin closes or the channel is gone.

use lookout_core::SessionCommand;
use std::io::BufRead;
use tokio::sync::mpsc;

/// Spawn the stdin reader thread.
pub fn spawn_key_reader(tx: mpsc::Sender<SessionCommand>) {
    std::thread::Builder::new()
        .name("lookout-keys".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match SessionCommand::parse(&line) {
                    Some(cmd) => {
                        if tx.blocking_send(cmd).is_err() {
                            // Session ended; nothing left to deliver to.
                            break;
                        }
                    }
                    None => {
                        if !line.trim().is_empty() {
                            tracing::debug!(input = %line.trim(), "ignoring unknown command");
                        }
                    }
                }
            }
            tracing::debug!("key reader exiting");
        })
        .expect("failed to spawn key reader thread");
}
