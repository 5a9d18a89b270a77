//! Audio capture from microphone
//!
//! Uses cpal for cross-platform capture.
//! The cpal stream lives on a dedicated thread (streams are not `Send` on every
//! host); samples are downmixed to mono, resampled and pushed through a
//! [`SourceLink`] towards the framing stage.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Audio configuration for capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    /// Samples per outbound frame (mono)
    pub frame_size: usize,
    /// Target sample rate of the emitted frames
    pub target_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            target_sample_rate: 16000,
        }
    }
}

/// Microphone capture errors
#[derive(Error, Debug)]
pub enum MicrophoneError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Failed to stop track {track}: {reason}")]
    TrackStop { track: String, reason: String },
}

/// Link between the device callback and the framing stage.
///
/// Cloned into the capture callback. Once disconnected, pushes are dropped.
#[derive(Clone)]
pub struct SourceLink {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Vec<f32>>>>>,
}

impl SourceLink {
    /// Create a connected link and the receiving end consumed by the framing stage
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<f32>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Forward a chunk of mono samples. Returns false if the link is down.
    pub fn push(&self, samples: Vec<f32>) -> bool {
        match self.tx.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(tx) => tx.send(samples).is_ok(),
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Cut the link. Later pushes become no-ops.
    pub fn disconnect(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

/// One physical track backing an acquired device
#[cfg_attr(test, mockall::automock)]
pub trait InputTrack: Send {
    /// Track label, for logs
    fn label(&self) -> String;

    /// Stop the track and release the hardware behind it
    fn stop(&mut self) -> Result<(), MicrophoneError>;
}

/// Exclusive hold on an input device, made of its physical tracks
pub struct DeviceHandle {
    tracks: Vec<Box<dyn InputTrack>>,
}

impl DeviceHandle {
    pub fn new(tracks: Vec<Box<dyn InputTrack>>) -> Self {
        Self { tracks }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Stop every track, carrying on past failures.
    ///
    /// Returns the errors of the tracks that failed to stop.
    pub fn stop_all(mut self) -> Vec<MicrophoneError> {
        let mut failures = Vec::new();
        for track in self.tracks.iter_mut() {
            match track.stop() {
                Ok(()) => tracing::debug!("Track {} stopped", track.label()),
                Err(e) => {
                    tracing::warn!("Track {} failed to stop: {}", track.label(), e);
                    failures.push(e);
                }
            }
        }
        self.tracks.clear();
        failures
    }
}

/// An audio input that can be acquired exclusively.
///
/// Acquisition may block (device negotiation), so callers run it off the
/// async workers.
pub trait AudioDevice: Send + 'static {
    /// Acquire the device and start pushing samples into `link`.
    ///
    /// Either everything is acquired or nothing is held on return.
    fn acquire(
        &mut self,
        config: &AudioConfig,
        link: SourceLink,
    ) -> Result<DeviceHandle, MicrophoneError>;
}

/// Default system input device through cpal
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDevice;

impl CpalDevice {
    pub fn new() -> Self {
        Self
    }

    /// List available input devices
    pub fn list_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

impl AudioDevice for CpalDevice {
    fn acquire(
        &mut self,
        config: &AudioConfig,
        link: SourceLink,
    ) -> Result<DeviceHandle, MicrophoneError> {
        let track = CpalTrack::open(config.clone(), link)?;
        Ok(DeviceHandle::new(vec![Box::new(track)]))
    }
}

/// Commands to control the capture thread
enum AudioCommand {
    Stop,
}

/// A cpal input stream running on its own thread
pub struct CpalTrack {
    label: String,
    command_tx: std_mpsc::Sender<AudioCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalTrack {
    /// Open the default input device and wait until the stream is playing
    fn open(config: AudioConfig, link: SourceLink) -> Result<Self, MicrophoneError> {
        let (command_tx, command_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<String, MicrophoneError>>();

        let thread_handle = thread::Builder::new()
            .name("vocalink-capture".into())
            .spawn(move || run_audio_capture(config, link, command_rx, ready_tx))
            .map_err(|e| MicrophoneError::StreamError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(label)) => Ok(Self {
                label,
                command_tx,
                thread_handle: Some(thread_handle),
            }),
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(MicrophoneError::StreamError(
                    "capture thread exited before reporting".into(),
                ))
            }
        }
    }
}

impl InputTrack for CpalTrack {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn stop(&mut self) -> Result<(), MicrophoneError> {
        let _ = self.command_tx.send(AudioCommand::Stop);
        match self.thread_handle.take() {
            Some(handle) => handle.join().map_err(|_| MicrophoneError::TrackStop {
                track: self.label.clone(),
                reason: "capture thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for CpalTrack {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Simple linear resample from source_rate to target_rate
pub(crate) fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx_floor = (src_idx.floor() as usize).min(samples.len() - 1);
        let idx_ceil = (idx_floor + 1).min(samples.len() - 1);
        let frac = (src_idx - idx_floor as f64) as f32;

        output.push(samples[idx_floor] * (1.0 - frac) + samples[idx_ceil] * frac);
    }

    output
}

/// Convert interleaved multi-channel audio to mono
pub(crate) fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

fn map_build_error(err: cpal::BuildStreamError) -> MicrophoneError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            MicrophoneError::PermissionDenied("device not available".into())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            MicrophoneError::ConfigError("stream config not supported".into())
        }
        other => MicrophoneError::StreamError(other.to_string()),
    }
}

/// Run audio capture (in a dedicated thread)
fn run_audio_capture(
    config: AudioConfig,
    link: SourceLink,
    command_rx: std_mpsc::Receiver<AudioCommand>,
    ready_tx: std_mpsc::Sender<Result<String, MicrophoneError>>,
) {
    let (stream, label) = match build_stream(&config, link) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(MicrophoneError::StreamError(e.to_string())));
        return;
    }

    tracing::info!("Audio capture started on {}", label);
    if ready_tx.send(Ok(label)).is_err() {
        return;
    }

    loop {
        match command_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(AudioCommand::Stop) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
        }
    }

    if let Err(e) = stream.pause() {
        tracing::warn!("Failed to pause input stream: {}", e);
    }
    drop(stream);
    tracing::info!("Audio capture stopped");
}

fn build_stream(
    config: &AudioConfig,
    link: SourceLink,
) -> Result<(cpal::Stream, String), MicrophoneError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(MicrophoneError::NoDevice)?;
    let label = device.name().unwrap_or_else(|_| "default".to_string());

    let supported_config = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            MicrophoneError::PermissionDenied("device not available".into())
        }
        other => MicrophoneError::ConfigError(other.to_string()),
    })?;

    let source_sample_rate = supported_config.sample_rate().0;
    let source_channels = supported_config.channels();
    let target_rate = config.target_sample_rate;
    if target_rate == 0 || config.frame_size == 0 {
        return Err(MicrophoneError::ConfigError(
            "sample rate and frame size must be non-zero".into(),
        ));
    }

    tracing::info!(
        "Audio config: {}Hz {}ch -> {}Hz mono",
        source_sample_rate,
        source_channels,
        target_rate
    );

    let stream_config: cpal::StreamConfig = supported_config.into();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix(data, source_channels);
                let resampled = resample(&mono, source_sample_rate, target_rate);
                if !resampled.is_empty() {
                    link.push(resampled);
                }
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(map_build_error)?;

    Ok((stream, label))
}
