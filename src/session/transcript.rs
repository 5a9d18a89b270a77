//! Transcript display log
//!
//! Text arriving from the transcription server, kept in arrival order.

/// One received transcript line
#[derive(Debug, Clone)]
pub struct TranscriptRecord {
    pub text: String,
}

/// Append-only transcript log.
///
/// Accepts text whatever the capture state: messages may arrive late, after
/// a stop, or before any start. Nothing is deduplicated or reordered.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    records: Vec<TranscriptRecord>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an inbound `text_data` message
    pub fn on_transcript(&mut self, text: impl Into<String>) -> &TranscriptRecord {
        let text = text.into();
        tracing::debug!("Transcript received: '{}'", text);
        self.records.push(TranscriptRecord { text });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TranscriptRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All lines joined with newlines
    pub fn text(&self) -> String {
        self.records
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_duplicates_in_arrival_order() {
        let mut log = TranscriptLog::new();
        log.on_transcript("hello");
        log.on_transcript("thank you");
        log.on_transcript("hello");

        assert_eq!(log.len(), 3);
        assert_eq!(log.text(), "hello\nthank you\nhello");
    }

    #[test]
    fn empty_log_has_no_text() {
        let log = TranscriptLog::new();
        assert!(log.is_empty());
        assert_eq!(log.text(), "");
    }
}
