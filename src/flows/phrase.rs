//! Sentence/language lookup
//!
//! Fetches `sentences/{sentence}/{language}.txt` for display and plays
//! `audio/{sentence}/{language}.mp3`.

use super::{catalog, resolve};
use crate::ui::{OutputPanel, Player};
use reqwest::Url;
use thiserror::Error;

pub const SELECT_SENTENCE_PROMPT: &str = "Please select a sentence.";
pub const SELECT_LANGUAGE_PROMPT: &str = "Please select a language.";
pub const FETCH_FAILED_MESSAGE: &str = "Error fetching text. Please try again.";

#[derive(Error, Debug)]
pub enum PhraseError {
    #[error("Missing selection: {0}")]
    MissingSelection(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// The two dropdown choices
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub sentence: Option<String>,
    pub language: Option<String>,
}

impl Selection {
    pub fn new(sentence: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            sentence: Some(sentence.into()),
            language: Some(language.into()),
        }
    }

    /// Both file ids, or the prompt to show for the first missing one.
    ///
    /// Sentences map spaces to underscores; known languages take their
    /// catalog spelling, unknown ones pass through trimmed.
    pub fn ids(&self) -> Result<(String, String), &'static str> {
        let sentence = non_blank(&self.sentence).ok_or(SELECT_SENTENCE_PROMPT)?;
        let language = non_blank(&self.language).ok_or(SELECT_LANGUAGE_PROMPT)?;
        Ok((
            catalog::sentence_id(sentence),
            catalog::language_id(language)
                .unwrap_or(language)
                .to_string(),
        ))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Client for the static sentence/audio file server
pub struct PhraseClient {
    http: reqwest::Client,
    base: Url,
}

impl PhraseClient {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn text_url(&self, sentence: &str, language: &str) -> Result<Url, PhraseError> {
        resolve(&self.base, &format!("sentences/{}/{}.txt", sentence, language))
            .map_err(PhraseError::InvalidUrl)
    }

    pub fn audio_url(&self, sentence: &str, language: &str) -> Result<Url, PhraseError> {
        resolve(&self.base, &format!("audio/{}/{}.mp3", sentence, language))
            .map_err(PhraseError::InvalidUrl)
    }

    /// Run the lookup for a selection, returning the displayed sentence text.
    ///
    /// A missing choice only shows a prompt; nothing is requested.
    pub async fn show(
        &self,
        selection: &Selection,
        panel: &mut dyn OutputPanel,
        player: &mut dyn Player,
    ) -> Result<String, PhraseError> {
        let (sentence, language) = match selection.ids() {
            Ok(ids) => ids,
            Err(prompt) => {
                panel.set_text(prompt);
                return Err(PhraseError::MissingSelection(prompt));
            }
        };

        let urls = self
            .text_url(&sentence, &language)
            .and_then(|text| Ok((text, self.audio_url(&sentence, &language)?)));
        let (text_url, audio_url) = match urls {
            Ok(urls) => urls,
            Err(e) => {
                panel.set_text(&format!("Error: {}", e));
                return Err(e);
            }
        };

        player.load(audio_url.as_str());
        if let Err(e) = player.play() {
            tracing::warn!("Playback failed: {}", e);
        }

        match self.fetch_text(text_url).await {
            Ok(text) => {
                panel.set_text(&text);
                Ok(text)
            }
            Err(e) => {
                tracing::error!("Error fetching text: {}", e);
                panel.set_text(FETCH_FAILED_MESSAGE);
                Err(e)
            }
        }
    }

    async fn fetch_text(&self, url: Url) -> Result<String, PhraseError> {
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PhraseError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PhraseError::Network(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| PhraseError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{BufferPanel, MockPlayer};
    use mockall::predicate::eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PhraseClient {
        let base = crate::flows::base_url(&server.uri()).unwrap();
        PhraseClient::new(reqwest::Client::new(), base)
    }

    #[tokio::test]
    async fn fetches_text_and_plays_matching_audio() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sentences/hello/fr.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Bonjour"))
            .expect(1)
            .mount(&server)
            .await;

        let mut player = MockPlayer::new();
        player
            .expect_load()
            .with(eq(format!("{}/audio/hello/fr.mp3", server.uri())))
            .times(1)
            .return_const(());
        player.expect_play().times(1).returning(|| Ok(()));

        let mut panel = BufferPanel::default();
        let text = client(&server)
            .show(&Selection::new("hello", "fr"), &mut panel, &mut player)
            .await
            .unwrap();

        assert_eq!(text, "Bonjour");
        assert_eq!(panel.text(), "Bonjour");
    }

    #[tokio::test]
    async fn display_names_map_to_catalog_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sentences/thank_you/French.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Merci"))
            .expect(1)
            .mount(&server)
            .await;

        let mut player = MockPlayer::new();
        player
            .expect_load()
            .with(eq(format!("{}/audio/thank_you/French.mp3", server.uri())))
            .times(1)
            .return_const(());
        player.expect_play().times(1).returning(|| Ok(()));

        let mut panel = BufferPanel::default();
        let text = client(&server)
            .show(&Selection::new("thank you", "french"), &mut panel, &mut player)
            .await
            .unwrap();

        assert_eq!(text, "Merci");
    }

    #[test]
    fn unknown_language_passes_through_trimmed() {
        let ids = Selection::new(" hello ", " fr ").ids().unwrap();
        assert_eq!(ids, ("hello".to_string(), "fr".to_string()));
    }

    #[tokio::test]
    async fn missing_sentence_prompts_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut player = MockPlayer::new();
        player.expect_load().times(0);
        player.expect_play().times(0);

        let mut panel = BufferPanel::default();
        let selection = Selection {
            sentence: None,
            language: Some("fr".into()),
        };
        let err = client(&server)
            .show(&selection, &mut panel, &mut player)
            .await
            .unwrap_err();

        assert!(matches!(err, PhraseError::MissingSelection(SELECT_SENTENCE_PROMPT)));
        assert_eq!(panel.text(), "Please select a sentence.");
    }

    #[tokio::test]
    async fn blank_language_prompts_for_language() {
        let server = MockServer::start().await;
        let mut player = MockPlayer::new();
        let mut panel = BufferPanel::default();

        let result = client(&server)
            .show(&Selection::new("hello", "  "), &mut panel, &mut player)
            .await;

        assert!(result.is_err());
        assert_eq!(panel.text(), SELECT_LANGUAGE_PROMPT);
    }

    #[tokio::test]
    async fn missing_text_file_shows_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sentences/thank_you/Monpa.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut player = MockPlayer::new();
        player.expect_load().return_const(());
        player.expect_play().returning(|| Ok(()));

        let mut panel = BufferPanel::default();
        let err = client(&server)
            .show(&Selection::new("thank_you", "Monpa"), &mut panel, &mut player)
            .await
            .unwrap_err();

        assert!(matches!(err, PhraseError::Network(_)));
        assert_eq!(panel.text(), FETCH_FAILED_MESSAGE);
    }
}
