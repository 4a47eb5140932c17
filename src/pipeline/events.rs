//! Events delivered to the application layer

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{trace, warn};

use super::{
    orientation::OrientationTransform,
    stats::AtomicPipelineStats,
    texture::TextureHandle,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    PhotoCaptured {
        texture: TextureHandle,
        width: u32,
        height: u32,
        transform: OrientationTransform,
    },
    PhotoCaptureFailed {
        reason: String,
    },
    PreviewTextureUpdated {
        texture: TextureHandle,
        width: u32,
        height: u32,
        transform: OrientationTransform,
    },
    CameraInitialized,
    PreviewPaused,
    PreviewResumed,
    CameraStopped,
}

impl CaptureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureEvent::PhotoCaptured { .. } => "PhotoCaptured",
            CaptureEvent::PhotoCaptureFailed { .. } => "PhotoCaptureFailed",
            CaptureEvent::PreviewTextureUpdated { .. } => "PreviewTextureUpdated",
            CaptureEvent::CameraInitialized => "CameraInitialized",
            CaptureEvent::PreviewPaused => "PreviewPaused",
            CaptureEvent::PreviewResumed => "PreviewResumed",
            CaptureEvent::CameraStopped => "CameraStopped",
        }
    }
}

/// Bounded application event stream.
///
/// Preview updates stop being queued once the backlog reaches its preview
/// limit; the newest update is dropped. Any other event evicts the oldest
/// queued event when the backlog is full, so photo and lifecycle events are
/// never refused.
#[derive(Debug, Clone)]
pub(crate) struct EventOutbox {
    tx: Sender<CaptureEvent>,
    rx: Receiver<CaptureEvent>,
    preview_limit: usize,
    stats: Arc<AtomicPipelineStats>,
}

impl EventOutbox {
    pub(crate) fn new(capacity: usize, reserved: usize, stats: Arc<AtomicPipelineStats>) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            preview_limit: capacity.saturating_sub(reserved).max(1),
            stats,
        }
    }

    pub(crate) fn post(&self, event: CaptureEvent) {
        if matches!(event, CaptureEvent::PreviewTextureUpdated { .. }) {
            if self.tx.len() >= self.preview_limit || self.tx.try_send(event).is_err() {
                AtomicPipelineStats::bump(&self.stats.events_dropped);
                trace!("Event backlog at preview limit, dropped preview update");
            }
            return;
        }

        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    event = returned;
                    if let Ok(evicted) = self.rx.try_recv() {
                        AtomicPipelineStats::bump(&self.stats.events_dropped);
                        warn!(evicted = evicted.name(), "Event backlog full, dropped oldest event");
                    }
                }
                // Unreachable while `rx` is held
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub(crate) fn receiver(&self) -> Receiver<CaptureEvent> {
        self.rx.clone()
    }
}
