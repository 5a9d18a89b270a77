//! User-facing surfaces: text panel, audio player and capture buttons

mod panel;
mod player;

pub use panel::{BufferPanel, OutputPanel, TerminalPanel};
pub use player::{CommandPlayer, PlaybackError, Player};

#[cfg(test)]
pub use player::MockPlayer;

use crate::session::CaptureState;

/// Enablement of the start and stop buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl Controls {
    pub fn for_state(state: CaptureState) -> Self {
        let capturing = state == CaptureState::Capturing;
        Self {
            start_enabled: !capturing,
            stop_enabled: capturing,
        }
    }
}
