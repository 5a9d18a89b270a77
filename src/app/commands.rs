//! Commands driving the capture session
//!
//! The single process-wide session lives in [`AppState`]; the CLI (or any
//! other front end) only goes through these commands.

use crate::audio::AudioDevice;
use crate::session::{CaptureSession, CaptureState, TranscriptLog};
use crate::ui::Controls;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
pub struct AppState<D: AudioDevice> {
    pub session: Arc<Mutex<CaptureSession<D>>>,
    pub transcript: Arc<Mutex<TranscriptLog>>,
}

impl<D: AudioDevice> AppState<D> {
    pub fn new(session: CaptureSession<D>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            transcript: Arc::new(Mutex::new(TranscriptLog::new())),
        }
    }
}

/// Status response for the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub is_capturing: bool,
    pub controls: Controls,
    pub transcript_lines: usize,
}

/// Start capturing and streaming
pub async fn start_capture<D: AudioDevice>(state: &AppState<D>) -> Result<(), String> {
    let mut session = state.session.lock().await;
    session.start().await.map_err(|e| e.to_string())?;
    tracing::info!("Capture command: started");
    Ok(())
}

/// Stop capturing; harmless when idle
pub async fn stop_capture<D: AudioDevice>(state: &AppState<D>) -> Result<(), String> {
    let mut session = state.session.lock().await;
    session.stop().await;
    tracing::info!("Capture command: stopped");
    Ok(())
}

/// Record an inbound transcript line, returning it for display
pub async fn receive_transcript<D: AudioDevice>(state: &AppState<D>, text: String) -> String {
    let mut log = state.transcript.lock().await;
    log.on_transcript(text).text.clone()
}

/// Current session status
pub async fn get_status<D: AudioDevice>(state: &AppState<D>) -> Result<StatusResponse, String> {
    let session = state.session.lock().await;
    let transcript_lines = state.transcript.lock().await.len();

    let capture_state = session.state();
    let status = match capture_state {
        CaptureState::Idle => "idle",
        CaptureState::Capturing => "capturing",
    };

    Ok(StatusResponse {
        status: status.to_string(),
        is_capturing: capture_state == CaptureState::Capturing,
        controls: session.controls(),
        transcript_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioConfig, DeviceHandle, Frame, MicrophoneError, SourceLink};
    use crate::session::FrameSink;

    struct NullSink;

    impl FrameSink for NullSink {
        fn emit(&self, _frame: Frame) {}
    }

    struct TracklessDevice {
        deny: bool,
    }

    impl AudioDevice for TracklessDevice {
        fn acquire(
            &mut self,
            _config: &AudioConfig,
            _link: SourceLink,
        ) -> Result<DeviceHandle, MicrophoneError> {
            if self.deny {
                Err(MicrophoneError::NoDevice)
            } else {
                Ok(DeviceHandle::new(Vec::new()))
            }
        }
    }

    fn state(deny: bool) -> AppState<TracklessDevice> {
        AppState::new(CaptureSession::new(
            TracklessDevice { deny },
            Arc::new(NullSink),
            AudioConfig::default(),
        ))
    }

    #[tokio::test]
    async fn status_tracks_start_and_stop() {
        let state = state(false);

        start_capture(&state).await.unwrap();
        let status = get_status(&state).await.unwrap();
        assert_eq!(status.status, "capturing");
        assert!(status.is_capturing);
        assert!(status.controls.stop_enabled);
        assert!(!status.controls.start_enabled);

        stop_capture(&state).await.unwrap();
        stop_capture(&state).await.unwrap();
        let status = get_status(&state).await.unwrap();
        assert_eq!(status.status, "idle");
        assert!(status.controls.start_enabled);
    }

    #[tokio::test]
    async fn failed_start_reports_device_error() {
        let state = state(true);

        let err = start_capture(&state).await.unwrap_err();
        assert!(err.contains("No audio input device"));
        assert!(!get_status(&state).await.unwrap().is_capturing);
    }

    #[tokio::test]
    async fn transcripts_accepted_while_idle() {
        let state = state(false);

        let shown = receive_transcript(&state, "hello".into()).await;
        assert_eq!(shown, "hello");
        assert_eq!(get_status(&state).await.unwrap().transcript_lines, 1);
    }
}
