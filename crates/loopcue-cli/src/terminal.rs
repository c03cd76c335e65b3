//! Feedback through the terminal: BEL for the cue, an external
//! text-to-speech program for spoken counts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use loopcue_core::{FeedbackChannel, PlaybackError};
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

const SPEECH_CANDIDATES: &[&str] = &["espeak-ng", "espeak", "say", "spd-say"];

pub struct TerminalChannel {
    speech_program: Option<PathBuf>,
    utterance: Mutex<Option<Child>>,
}

impl TerminalChannel {
    /// `configured` overrides the PATH search when set.
    pub fn new(configured: Option<&str>) -> Self {
        let speech_program = match configured {
            Some(program) => find_program(program),
            None => SPEECH_CANDIDATES.iter().find_map(|p| find_program(p)),
        };
        match &speech_program {
            Some(path) => debug!(program = %path.display(), "speech program found"),
            None => warn!("no speech program found; spoken counts fall back to text"),
        }
        Self {
            speech_program,
            utterance: Mutex::new(None),
        }
    }
}

fn find_program(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

#[async_trait]
impl FeedbackChannel for TerminalChannel {
    async fn play_cue(&self) -> Result<(), PlaybackError> {
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| PlaybackError::Failed(e.to_string()))
    }

    async fn speak(&self, n: u32) -> Result<(), PlaybackError> {
        let Some(program) = &self.speech_program else {
            eprintln!("{n}");
            return Ok(());
        };
        let child = Command::new(program)
            .arg(n.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::Unavailable(e.to_string()))?;
        // Replacing the slot drops the previous handle; the runtime reaps it.
        *self.utterance.lock() = Some(child);
        Ok(())
    }

    fn cancel_speech(&self) {
        if let Some(mut child) = self.utterance.lock().take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "utterance already finished");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_found() {
        assert!(find_program("definitely-not-a-speech-program-0x7f").is_none());
        assert!(find_program("/nonexistent/dir/espeak").is_none());
    }

    #[tokio::test]
    async fn text_fallback_speaks_without_program() {
        let channel = TerminalChannel {
            speech_program: None,
            utterance: Mutex::new(None),
        };
        assert!(channel.speak(7).await.is_ok());
        channel.cancel_speech();
    }

    #[tokio::test]
    async fn cancel_kills_the_running_utterance() {
        // Any long-running program stands in for a speech engine.
        let Some(sleep) = find_program("sleep") else {
            return;
        };
        let channel = TerminalChannel {
            speech_program: Some(sleep),
            utterance: Mutex::new(None),
        };
        channel.speak(5).await.unwrap();
        assert!(channel.utterance.lock().is_some());

        channel.cancel_speech();
        assert!(channel.utterance.lock().is_none());
        channel.cancel_speech();
    }
}
