//! Optional background speech-recognition listener.
//!
//! Runs an external recognizer command that prints one transcript per line
//! on stdout, and delivers each line to a registered callback from a
//! background thread. The session loop never synchronizes with this thread
//! beyond installing the callback; transcripts that parse as commands are
//! routed into the session's command channel by the caller.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Handle to the background listening thread. Dropping it does not stop
/// the thread; shutdown is best-effort via [`stop`](Self::stop) and the
/// thread is never joined.
pub struct TranscriptListener {
    running: Arc<AtomicBool>,
    child: Arc<Mutex<Child>>,
}

impl TranscriptListener {
    /// Spawn `command` (whitespace-split into program + args) and start a
    /// thread that feeds its stdout lines to `on_transcript`.
    ///
    /// Returns an error only when the recognizer process cannot be started;
    /// everything after that is log-and-continue.
    pub fn spawn<F>(command: &str, on_transcript: F) -> std::io::Result<TranscriptListener>
    where
        F: Fn(String) + Send + 'static,
    {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty listener command")
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "recognizer has no stdout")
        })?;

        let running = Arc::new(AtomicBool::new(true));
        let child = Arc::new(Mutex::new(child));

        let thread_running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("lookout-listener".into())
            .spawn(move || {
                tracing::info!("transcript listener started");
                let reader = BufReader::new(stdout);
                for line in reader.lines() {
                    if !thread_running.load(Ordering::Relaxed) {
                        break;
                    }
                    match line {
                        Ok(text) => {
                            let text = text.trim().to_string();
                            if text.is_empty() {
                                // Unintelligible or empty result: keep listening.
                                continue;
                            }
                            tracing::debug!(%text, "heard");
                            on_transcript(text);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "recognizer read error");
                            continue;
                        }
                    }
                }
                tracing::info!("transcript listener stopped");
            })
            .expect("failed to spawn listener thread");

        Ok(TranscriptListener { running, child })
    }

    /// Best-effort shutdown: stop consuming transcripts and kill the
    /// recognizer process. The reader thread exits on the resulting EOF.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Ok(mut child) = self.child.lock() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "recognizer already gone");
            }
            let _ = child.wait();
        }
    }
}
