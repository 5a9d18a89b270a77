//! Form submission to `/process-audio`
//!
//! The server answers `{"audio_file": ...}` to play, or `{"error": ...}`.

use super::resolve;
use crate::ui::{OutputPanel, Player};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Body returned by `/process-audio`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessAudioResponse {
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct FormClient {
    http: reqwest::Client,
    base: Url,
}

impl FormClient {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    /// Post the form and play the returned audio file.
    ///
    /// Returns the audio file path as sent by the server.
    pub async fn submit(
        &self,
        fields: &[(String, String)],
        panel: &mut dyn OutputPanel,
        player: &mut dyn Player,
    ) -> Result<String, SubmitError> {
        player.pause();
        player.rewind();
        panel.set_text("");

        let body = match self.post(fields).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Form submission failed: {}", e);
                panel.set_text(&format!("Error: {}", e));
                return Err(e);
            }
        };

        match body.audio_file.filter(|f| !f.is_empty()) {
            Some(audio_file) => {
                let source = match resolve(&self.base, &audio_file) {
                    Ok(source) => source,
                    Err(e) => {
                        let e = SubmitError::InvalidUrl(e);
                        tracing::warn!("Unplayable audio file from server: {}", e);
                        panel.set_text(&format!("Error: {}", e));
                        return Err(e);
                    }
                };
                player.load(source.as_str());
                if let Err(e) = player.play() {
                    tracing::warn!("Playback failed: {}", e);
                }
                panel.set_text(&format!("Playing: {}", audio_file));
                Ok(audio_file)
            }
            None => {
                let message = body.error.unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!("Server rejected submission: {}", message);
                panel.set_text(&format!("Error: {}", message));
                Err(SubmitError::Rejected(message))
            }
        }
    }

    async fn post(&self, fields: &[(String, String)]) -> Result<ProcessAudioResponse, SubmitError> {
        let url = resolve(&self.base, "process-audio").map_err(SubmitError::InvalidUrl)?;
        tracing::debug!("POST {} ({} field(s))", url, fields.len());

        // Error bodies are JSON too, so the status is not checked here.
        self.http
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?
            .json::<ProcessAudioResponse>()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))
    }
}

/// Parse `key=value` pairs from the command line
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
