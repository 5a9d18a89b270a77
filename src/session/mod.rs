//! Capture session module
//!
//! Microphone → framing stage → frame sink, plus the inbound transcript log.

mod capture;
mod framing_stage;
mod transcript;

pub use capture::{CaptureSession, CaptureState, SessionError};
pub use framing_stage::FrameSink;
pub use transcript::{TranscriptLog, TranscriptRecord};
