//! Audio capture module
//!
//! Handles microphone acquisition and slicing of the captured stream into frames.

mod framing;
mod microphone;

pub use framing::{Frame, Framer};
pub use microphone::{
    AudioConfig, AudioDevice, CpalDevice, CpalTrack, DeviceHandle, InputTrack, MicrophoneError,
    SourceLink,
};

#[cfg(test)]
pub use microphone::MockInputTrack;
