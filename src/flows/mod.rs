//! Request/response flows against the web server
//!
//! Phrase lookup (static text + audio files) and audio form submission.

pub mod catalog;
mod phrase;
mod submit;

pub use phrase::{
    PhraseClient, PhraseError, Selection, FETCH_FAILED_MESSAGE, SELECT_LANGUAGE_PROMPT,
    SELECT_SENTENCE_PROMPT,
};
pub use submit::{parse_field, FormClient, ProcessAudioResponse, SubmitError};

use reqwest::Url;

/// Parse a server base URL, making sure relative joins stay under its path
pub fn base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| format!("{}: {}", raw, e))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn resolve(base: &Url, relative: &str) -> Result<Url, String> {
    base.join(relative).map_err(|e| format!("{}: {}", relative, e))
}
