//! Sentences and languages offered by the phrase server

/// Predefined sentences, as spoken
pub const SENTENCES: [&str; 10] = [
    "hello",
    "goodbye",
    "how are you",
    "good wishes",
    "i will drink water",
    "i will have food",
    "my name is",
    "thank you",
    "will you drink water",
    "will you have food",
];

/// Language ids, which are also the file stems on the server
pub const LANGUAGES: [&str; 5] = ["Apatani", "Bhutanese", "French", "Hindi", "Monpa"];

/// Directory id of a sentence (`"thank you"` → `"thank_you"`)
pub fn sentence_id(sentence: &str) -> String {
    sentence.trim().replace(' ', "_")
}

/// Case-insensitive lookup of a known language id
pub fn language_id(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .copied()
        .find(|l| l.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_ids_use_underscores() {
        assert_eq!(sentence_id("i will drink water"), "i_will_drink_water");
        assert_eq!(sentence_id("hello"), "hello");
    }

    #[test]
    fn language_lookup_ignores_case() {
        assert_eq!(language_id("french"), Some("French"));
        assert_eq!(language_id(" MONPA "), Some("Monpa"));
        assert_eq!(language_id("Klingon"), None);
    }
}
