//! Microphone capture session
//!
//! Owns the device while capturing and streams frames to the frame sink.

use super::framing_stage::{FrameSink, FramingStage};
use crate::audio::{AudioConfig, AudioDevice, DeviceHandle, MicrophoneError, SourceLink};
use crate::ui::Controls;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Capture session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Device access error: {0}")]
    DeviceAccess(#[from] MicrophoneError),

    #[error("Capture already running")]
    AlreadyCapturing,
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// Resources held while capturing
struct ActiveCapture {
    framing: FramingStage,
    link: SourceLink,
    device: DeviceHandle,
}

enum SessionState {
    Idle,
    Capturing(ActiveCapture),
}

/// Lifecycle of a microphone-to-stream pipeline
pub struct CaptureSession<D: AudioDevice> {
    config: AudioConfig,
    device: Arc<Mutex<D>>,
    sink: Arc<dyn FrameSink>,
    state: SessionState,
}

impl<D: AudioDevice> CaptureSession<D> {
    /// Create an idle session
    pub fn new(device: D, sink: Arc<dyn FrameSink>, config: AudioConfig) -> Self {
        Self {
            config,
            device: Arc::new(Mutex::new(device)),
            sink,
            state: SessionState::Idle,
        }
    }

    /// Acquire the device and start streaming frames.
    ///
    /// Must be called from within a tokio runtime. The device is negotiated on
    /// the blocking pool. On denial nothing is held and the session stays
    /// idle; the caller may simply retry.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Capturing(_)) {
            return Err(SessionError::AlreadyCapturing);
        }

        let (link, source_rx) = SourceLink::new();

        let acquired = {
            let device = Arc::clone(&self.device);
            let config = self.config.clone();
            let link = link.clone();
            tokio::task::spawn_blocking(move || {
                let mut device = device.lock().map_err(|_| {
                    MicrophoneError::StreamError("audio device lock poisoned".into())
                })?;
                device.acquire(&config, link)
            })
            .await
            .unwrap_or_else(|e| {
                Err(MicrophoneError::StreamError(format!("acquisition task failed: {}", e)))
            })
        };

        let device = match acquired {
            Ok(handle) => handle,
            Err(e) => {
                link.disconnect();
                tracing::warn!("Microphone access failed: {}", e);
                return Err(SessionError::DeviceAccess(e));
            }
        };

        let framing = FramingStage::spawn(source_rx, self.config.frame_size, Arc::clone(&self.sink));

        tracing::info!(
            "Capture started ({} track(s), {} samples/frame)",
            device.track_count(),
            self.config.frame_size
        );

        self.state = SessionState::Capturing(ActiveCapture {
            framing,
            link,
            device,
        });
        Ok(())
    }

    /// Release everything acquired by `start`. No-op when idle.
    ///
    /// Order: framing stage, then the source link, then every track.
    /// Track failures are logged and do not keep the session capturing.
    pub async fn stop(&mut self) {
        let active = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => return,
            SessionState::Capturing(active) => active,
        };

        let emitted = active.framing.stop().await;
        active.link.disconnect();
        let device = active.device;
        let failures = tokio::task::spawn_blocking(move || device.stop_all())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Track release task failed: {}", e);
                Vec::new()
            });

        if failures.is_empty() {
            tracing::info!("Capture stopped after {} frame(s)", emitted);
        } else {
            tracing::warn!(
                "Capture stopped after {} frame(s), {} track(s) failed to stop",
                emitted,
                failures.len()
            );
        }
    }

    pub fn state(&self) -> CaptureState {
        match self.state {
            SessionState::Idle => CaptureState::Idle,
            SessionState::Capturing(_) => CaptureState::Capturing,
        }
    }

    /// Whether a device handle is currently held
    pub fn holds_device(&self) -> bool {
        matches!(self.state, SessionState::Capturing(_))
    }

    /// Button enablement for the current state
    pub fn controls(&self) -> Controls {
        Controls::for_state(self.state())
    }
}

impl<D: AudioDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        if let SessionState::Capturing(active) = std::mem::replace(&mut self.state, SessionState::Idle) {
            // Dropping the stage aborts the task; no await possible here.
            drop(active.framing);
            active.link.disconnect();
            active.device.stop_all();
            tracing::debug!("Capture session dropped while capturing, resources released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Frame, InputTrack, MockInputTrack};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const FRAME: usize = 8;

    struct ChannelSink(mpsc::UnboundedSender<Frame>);

    impl FrameSink for ChannelSink {
        fn emit(&self, frame: Frame) {
            let _ = self.0.send(frame);
        }
    }

    /// Device handing out two mock tracks and keeping the last link
    #[derive(Default)]
    struct FakeDevice {
        acquisitions: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        link: Arc<Mutex<Option<SourceLink>>>,
        deny: bool,
        /// First track reports a failure when stopped
        fail_first: bool,
        /// Per stopped track: whether the link was already cut at that point
        cut_at_stop: Arc<Mutex<Vec<bool>>>,
    }

    impl FakeDevice {
        fn track(&self, label: &str, link: &SourceLink, fail: bool) -> Box<dyn InputTrack> {
            let mut track = MockInputTrack::new();
            let stops = Arc::clone(&self.stops);
            let cut_at_stop = Arc::clone(&self.cut_at_stop);
            let link = link.clone();
            let name = label.to_string();
            track.expect_label().return_const(label.to_string());
            track.expect_stop().times(1).returning(move || {
                stops.fetch_add(1, Ordering::SeqCst);
                cut_at_stop.lock().unwrap().push(!link.is_connected());
                if fail {
                    Err(MicrophoneError::TrackStop {
                        track: name.clone(),
                        reason: "device busy".into(),
                    })
                } else {
                    Ok(())
                }
            });
            Box::new(track)
        }

        fn feed(link: &Arc<Mutex<Option<SourceLink>>>, samples: usize) -> bool {
            let guard = link.lock().unwrap();
            guard.as_ref().unwrap().push(vec![0.25; samples])
        }
    }

    impl AudioDevice for FakeDevice {
        fn acquire(
            &mut self,
            _config: &AudioConfig,
            link: SourceLink,
        ) -> Result<DeviceHandle, MicrophoneError> {
            if self.deny {
                return Err(MicrophoneError::PermissionDenied("user refused".into()));
            }
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            let tracks = vec![
                self.track("left", &link, self.fail_first),
                self.track("right", &link, false),
            ];
            *self.link.lock().unwrap() = Some(link);
            Ok(DeviceHandle::new(tracks))
        }
    }

    fn session(device: FakeDevice) -> (CaptureSession<FakeDevice>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = AudioConfig {
            frame_size: FRAME,
            ..Default::default()
        };
        (CaptureSession::new(device, Arc::new(ChannelSink(tx)), config), rx)
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_noop() {
        let (mut session, _rx) = session(FakeDevice::default());
        session.stop().await;
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.holds_device());
    }

    #[tokio::test]
    async fn device_held_only_while_capturing() {
        let device = FakeDevice::default();
        let stops = Arc::clone(&device.stops);
        let (mut session, _rx) = session(device);

        for _ in 0..3 {
            assert_eq!(session.holds_device(), session.state() == CaptureState::Capturing);
            session.start().await.unwrap();
            assert_eq!(session.state(), CaptureState::Capturing);
            assert!(session.holds_device());
            session.stop().await;
            assert_eq!(session.state(), CaptureState::Idle);
            assert!(!session.holds_device());
        }
        assert_eq!(stops.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn second_start_does_not_acquire_again() {
        let device = FakeDevice::default();
        let acquisitions = Arc::clone(&device.acquisitions);
        let (mut session, _rx) = session(device);

        session.start().await.unwrap();
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyCapturing));
        assert_eq!(acquisitions.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), CaptureState::Capturing);

        session.stop().await;
    }

    #[tokio::test]
    async fn denied_access_leaves_session_idle() {
        let (mut session, _rx) = session(FakeDevice {
            deny: true,
            ..Default::default()
        });

        let err = session.start().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeviceAccess(MicrophoneError::PermissionDenied(_))
        ));
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.holds_device());
        assert!(session.controls().start_enabled);
    }

    #[tokio::test]
    async fn five_frames_then_stop_emits_nothing_more() {
        let device = FakeDevice::default();
        let link = Arc::clone(&device.link);
        let stops = Arc::clone(&device.stops);
        let (mut session, mut rx) = session(device);

        session.start().await.unwrap();
        for _ in 0..5 {
            assert!(FakeDevice::feed(&link, FRAME));
        }
        for _ in 0..5 {
            let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("frame in time")
                .expect("sink open");
            assert_eq!(frame.len(), FRAME);
        }

        session.stop().await;
        assert_eq!(stops.load(Ordering::SeqCst), 2);

        // The link is cut: late device callbacks go nowhere.
        assert!(!FakeDevice::feed(&link, FRAME * 3));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_track_does_not_block_release() {
        let device = FakeDevice {
            fail_first: true,
            ..Default::default()
        };
        let stops = Arc::clone(&device.stops);
        let cut_at_stop = Arc::clone(&device.cut_at_stop);
        let (mut session, _rx) = session(device);

        session.start().await.unwrap();
        session.stop().await;

        // The link is cut before the first track is asked to stop.
        assert_eq!(*cut_at_stop.lock().unwrap(), vec![true, true]);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.holds_device());
        assert!(session.controls().start_enabled);
    }

    #[tokio::test]
    async fn controls_follow_state() {
        let (mut session, _rx) = session(FakeDevice::default());
        assert_eq!(
            session.controls(),
            Controls {
                start_enabled: true,
                stop_enabled: false
            }
        );
        session.start().await.unwrap();
        assert_eq!(
            session.controls(),
            Controls {
                start_enabled: false,
                stop_enabled: true
            }
        );
        session.stop().await;
    }

    #[tokio::test]
    async fn dropping_a_capturing_session_stops_tracks() {
        let device = FakeDevice::default();
        let stops = Arc::clone(&device.stops);
        let link = Arc::clone(&device.link);
        let (mut session, _rx) = session(device);

        session.start().await.unwrap();
        drop(session);

        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert!(!FakeDevice::feed(&link, FRAME));
    }
}
