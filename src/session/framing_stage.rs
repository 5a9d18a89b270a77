//! Framing stage task
//!
//! Drains the source link, cuts frames and hands each one to the frame sink.

use crate::audio::{Frame, Framer};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Outbound channel for completed frames.
///
/// `emit` must not block and must not wait for acknowledgement.
pub trait FrameSink: Send + Sync {
    fn emit(&self, frame: Frame);
}

/// Running framing task
pub(crate) struct FramingStage {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<usize>>,
}

impl FramingStage {
    /// Spawn the framing task on the current tokio runtime
    pub(crate) fn spawn(
        mut source_rx: mpsc::UnboundedReceiver<Vec<f32>>,
        frame_size: usize,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut framer = Framer::new(frame_size);
            let mut emitted = 0usize;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        tracing::debug!("Stop signal received");
                        break;
                    }
                    chunk = source_rx.recv() => {
                        let Some(samples) = chunk else {
                            tracing::debug!("Source link closed");
                            break;
                        };
                        for frame in framer.push(&samples) {
                            sink.emit(frame);
                            emitted += 1;
                        }
                    }
                }
            }

            emitted
        });

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop the task and wait for it, so no frame is emitted afterwards
    pub(crate) async fn stop(mut self) -> usize {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        match self.task.take() {
            Some(task) => match task.await {
                Ok(emitted) => emitted,
                Err(e) => {
                    tracing::warn!("Framing task ended abnormally: {}", e);
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for FramingStage {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
