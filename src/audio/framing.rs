//! Fixed-size framing of a continuous mono sample stream

use ringbuf::{traits::*, HeapRb};

/// One fixed-size block of mono samples
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Vec<f32>,
}

impl Frame {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Slices incoming chunks of any size into frames of exactly `frame_size` samples.
///
/// Leftover samples stay in the ring until a later chunk completes the frame.
pub struct Framer {
    frame_size: usize,
    ring: HeapRb<f32>,
}

impl Framer {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            ring: HeapRb::<f32>::new(frame_size * 2),
        }
    }

    /// Samples waiting for the next frame to complete
    pub fn pending(&self) -> usize {
        self.ring.occupied_len()
    }

    /// Feed samples, returning every frame completed by them
    pub fn push(&mut self, mut samples: &[f32]) -> Vec<Frame> {
        let mut frames = Vec::new();
        while !samples.is_empty() {
            let pushed = self.ring.push_slice(samples);
            samples = &samples[pushed..];

            while self.ring.occupied_len() >= self.frame_size {
                let mut buf = vec![0.0; self.frame_size];
                self.ring.pop_slice(&mut buf);
                frames.push(Frame::new(buf));
            }
        }
        frames
    }
}
