//! Audio playback of remote files
//!
//! No decoding happens here: playback is delegated to an external program.

use std::process::{Child, Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("No audio source loaded")]
    NoSource,

    #[error("Failed to launch player '{program}': {reason}")]
    Launch { program: String, reason: String },
}

/// Audio element abstraction
#[cfg_attr(test, mockall::automock)]
pub trait Player: Send {
    /// Set the source URL to play
    fn load(&mut self, source: &str);

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Back to the start of the current source
    fn rewind(&mut self);
}

/// Plays sources by spawning `<program> <url>`
pub struct CommandPlayer {
    program: Option<String>,
    source: Option<String>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(program: Option<String>) -> Self {
        Self {
            program,
            source: None,
            child: None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Block until the current playback finishes
    pub fn wait(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                tracing::warn!("Player exited abnormally: {}", e);
            }
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Player for CommandPlayer {
    fn load(&mut self, source: &str) {
        self.kill_child();
        self.source = Some(source.to_string());
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let source = self.source.clone().ok_or(PlaybackError::NoSource)?;
        self.kill_child();

        let Some(program) = self.program.as_deref() else {
            tracing::info!("No player configured, audio at {}", source);
            return Ok(());
        };

        let child = Command::new(program)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::Launch {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Playing {} with {}", source, program);
        self.child = Some(child);
        Ok(())
    }

    fn pause(&mut self) {
        self.kill_child();
    }

    fn rewind(&mut self) {
        // A spawned player always starts from the beginning.
        self.kill_child();
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.kill_child();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_without_source_fails() {
        let mut player = CommandPlayer::new(None);
        assert!(matches!(player.play(), Err(PlaybackError::NoSource)));
    }

    #[test]
    fn play_without_program_only_logs() {
        let mut player = CommandPlayer::new(None);
        player.load("http://localhost/audio/hello/fr.mp3");
        assert!(player.play().is_ok());
        assert_eq!(player.source(), Some("http://localhost/audio/hello/fr.mp3"));
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let mut player = CommandPlayer::new(Some("vocalink-no-such-player".into()));
        player.load("x.mp3");
        assert!(matches!(player.play(), Err(PlaybackError::Launch { .. })));
    }
}
