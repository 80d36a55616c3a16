//! Speech output via an external synthesizer process.

use lookout_core::SpeechOutput;
use std::process::Command;
use std::time::Instant;

/// Blocking TTS backend that hands each utterance to an external
/// synthesizer command (by default `espeak-ng`). The call returns when the
/// process exits, i.e. after playback, which stalls the session loop for
/// the duration of the utterance. That is the documented behavior of the
/// pipeline, not an accident.
pub struct SubprocessSpeaker {
    program: String,
    extra_args: Vec<String>,
}

impl SubprocessSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments inserted before the utterance text (voice, rate, ...).
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

impl Default for SubprocessSpeaker {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl SpeechOutput for SubprocessSpeaker {
    fn speak(&mut self, text: &str) {
        let started = Instant::now();
        match Command::new(&self.program)
            .args(&self.extra_args)
            .arg(text)
            .status()
        {
            Ok(status) if status.success() => {
                tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, text, "spoke");
            }
            Ok(status) => {
                tracing::warn!(%status, program = %self.program, "synthesizer exited with failure");
            }
            Err(e) => {
                tracing::warn!(error = %e, program = %self.program, "could not launch synthesizer");
            }
        }
    }
}
