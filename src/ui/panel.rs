//! Text output surface

use std::io::Write;

/// Where user-facing messages end up
pub trait OutputPanel: Send {
    /// Replace the displayed text
    fn set_text(&mut self, text: &str);

    /// Add a line under the current text
    fn append_line(&mut self, text: &str);
}

/// Prints to stdout
#[derive(Debug, Default)]
pub struct TerminalPanel;

impl OutputPanel for TerminalPanel {
    fn set_text(&mut self, text: &str) {
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    fn append_line(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "> {}", text);
        let _ = out.flush();
    }
}

/// Keeps the current text in memory
#[derive(Debug, Default, Clone)]
pub struct BufferPanel {
    text: String,
}

impl BufferPanel {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl OutputPanel for BufferPanel {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn append_line(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_panel_replaces_and_appends() {
        let mut panel = BufferPanel::default();
        panel.append_line("first");
        panel.append_line("second");
        assert_eq!(panel.text(), "first\nsecond");

        panel.set_text("reset");
        assert_eq!(panel.text(), "reset");
    }
}
