//! Managed-side capture state machine
//!
//! Every inbound record goes through the same pass: decode and validate,
//! copy the native bytes out, release the native buffer, and only then do
//! anything slow. The release is owned by a drop guard so no early return
//! or panic can skip it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::{
    buffers::BufferAddress,
    config::{DEFAULT_EVENT_BACKLOG, RESERVED_EVENT_SLOTS},
    error::{DaguerreError, ErrorKind, Result},
    session::{CaptureConfig, LifecycleEvent, NativeEvent},
    transfer::{
        salvage_address, validate_photo_payload, validate_record, EncodedRecord, EventKind,
        TransferRecord,
    },
};

use super::{
    bridge::CameraBridge,
    dispatcher::DispatchQueue,
    events::{CaptureEvent, EventOutbox},
    guard::{CaptureGuard, CaptureState},
    orientation::{derive_transform, DeviceOrientation, OrientationTransform},
    stats::{AtomicPipelineStats, PipelineStats},
    texture::{TextureSet, TextureStore},
};

/// Releases a native address exactly once: explicitly, or on drop
struct ReleaseOnce<'a> {
    bridge: &'a dyn CameraBridge,
    stats: &'a AtomicPipelineStats,
    address: Option<BufferAddress>,
}

impl<'a> ReleaseOnce<'a> {
    fn new(bridge: &'a dyn CameraBridge, stats: &'a AtomicPipelineStats, address: Option<BufferAddress>) -> Self {
        Self { bridge, stats, address }
    }

    fn release_now(&mut self) -> Result<()> {
        match self.address.take() {
            Some(address) => {
                let result = self.bridge.release(address);
                match &result {
                    Ok(()) => AtomicPipelineStats::bump(&self.stats.releases),
                    Err(_) => AtomicPipelineStats::bump(&self.stats.release_failures),
                }
                result
            }
            None => Ok(()),
        }
    }
}

impl Drop for ReleaseOnce<'_> {
    fn drop(&mut self) {
        let address = self.address;
        if let Err(e) = self.release_now() {
            warn!(address = ?address, error = %e, "Failed to release native buffer");
        }
    }
}

/// Single-flight photo capture and preview presentation
pub struct CaptureStateMachine {
    bridge: Arc<dyn CameraBridge>,
    capture_config: CaptureConfig,
    guard: CaptureGuard,
    queue: DispatchQueue,
    textures: Arc<TextureSet>,
    device_orientation: RwLock<DeviceOrientation>,
    events: EventOutbox,
    camera_active: AtomicBool,
    preview_paused: AtomicBool,
    quitting: AtomicBool,
    stats: Arc<AtomicPipelineStats>,
}

impl std::fmt::Debug for CaptureStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStateMachine")
            .field("state", &self.capture_state())
            .field("camera_active", &self.is_camera_active())
            .field("preview_paused", &self.is_preview_paused())
            .field("textures", &self.textures)
            .finish()
    }
}

impl CaptureStateMachine {
    /// `queue` must belong to the dispatcher run by the thread that owns the
    /// textures in `store`
    pub fn new(
        bridge: Arc<dyn CameraBridge>,
        capture_config: CaptureConfig,
        queue: DispatchQueue,
        store: Box<dyn TextureStore>,
    ) -> Self {
        let stats = Arc::new(AtomicPipelineStats::default());
        Self {
            bridge,
            capture_config,
            guard: CaptureGuard::new(),
            queue,
            textures: Arc::new(TextureSet::new(store)),
            device_orientation: RwLock::new(DeviceOrientation::Portrait),
            events: EventOutbox::new(DEFAULT_EVENT_BACKLOG, RESERVED_EVENT_SLOTS, Arc::clone(&stats)),
            camera_active: AtomicBool::new(false),
            preview_paused: AtomicBool::new(false),
            quitting: AtomicBool::new(false),
            stats,
        }
    }

    /// Start a photo capture. Fails with `StateConflict` while one is in
    /// flight; nothing is queued.
    pub fn request_photo(&self) -> Result<()> {
        if self.is_quitting() {
            return Err(DaguerreError::session_closed("capture pipeline is shutting down"));
        }
        self.collect_abandoned_photo();
        if let Err(e) = self.guard.try_enter() {
            AtomicPipelineStats::bump(&self.stats.requests_rejected);
            debug!("Photo requested while capturing");
            return Err(e);
        }
        if let Err(e) = self.bridge.request_photo() {
            self.guard.exit();
            if e.kind() == ErrorKind::StateConflict {
                AtomicPipelineStats::bump(&self.stats.requests_rejected);
            }
            warn!(error = %e, "Native photo request failed");
            return Err(e);
        }
        info!("Photo capture started");
        Ok(())
    }

    /// Process one message from the native session
    pub fn handle_native_event(&self, event: NativeEvent) {
        if self.is_quitting() {
            AtomicPipelineStats::bump(&self.stats.late_events);
            debug!(?event, "Ignoring native event after shutdown");
            return;
        }
        self.collect_abandoned_photo();
        match event {
            NativeEvent::Photo(encoded) => self.handle_photo(&encoded),
            NativeEvent::PhotoFailed(reason) => {
                if self.guard.exit() {
                    self.fail_photo(reason);
                } else {
                    debug!(%reason, "Photo failure with no capture in flight");
                }
            }
            NativeEvent::Preview(encoded) => self.handle_preview(&encoded),
            NativeEvent::Lifecycle(lifecycle) => self.handle_lifecycle(lifecycle),
        }
    }

    /// The native event stream closed. A capture in flight can no longer
    /// complete and is failed.
    pub fn handle_disconnect(&self) {
        if self.is_quitting() {
            return;
        }
        self.collect_abandoned_photo();
        if self.guard.exit() {
            self.fail_photo("native event stream closed".into());
        }
        self.camera_active.store(false, Ordering::Release);
        warn!("Native event stream closed");
    }

    /// Forward a device orientation reading and use it for later previews
    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        *self.device_orientation.write() = orientation;
        self.bridge.set_device_orientation(orientation);
    }

    /// Drop idle native buffers under memory pressure
    pub fn handle_low_memory(&self) -> usize {
        let freed = self.bridge.trim();
        warn!(freed, "Low memory, trimmed native buffer pool");
        freed
    }

    /// Stop the native session and release textures. Later native events are
    /// ignored.
    pub fn shutdown(&self) {
        if self.quitting.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.guard.exit() {
            self.fail_photo("capture pipeline shut down".into());
        }
        self.bridge.shutdown();

        let textures = Arc::clone(&self.textures);
        if self.queue.enqueue(move || textures.clear()).is_err() {
            self.textures.clear();
        }
        self.queue.close();
        info!("Capture pipeline shut down");
    }

    /// Receiver of application-facing events; clones share one stream.
    ///
    /// The stream is bounded. Preview updates are dropped while it is nearly
    /// full and, once full, other events displace the oldest queued one.
    pub fn events(&self) -> Receiver<CaptureEvent> {
        self.events.receiver()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.guard.state()
    }

    pub fn guard(&self) -> &CaptureGuard {
        &self.guard
    }

    pub fn textures(&self) -> &Arc<TextureSet> {
        &self.textures
    }

    pub fn device_orientation(&self) -> DeviceOrientation {
        *self.device_orientation.read()
    }

    pub fn is_camera_active(&self) -> bool {
        self.camera_active.load(Ordering::Acquire)
    }

    pub fn is_preview_paused(&self) -> bool {
        self.preview_paused.load(Ordering::Acquire)
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.snapshot()
    }

    // Record handling

    fn handle_photo(&self, encoded: &EncodedRecord) {
        match self.accept(encoded).and_then(|(record, bytes)| {
            validate_photo_payload(&bytes)?;
            Ok((record, bytes))
        }) {
            Ok((record, bytes)) => {
                let transform = self.transform_for(&record);
                self.present(EventKind::Photo, &record, bytes, transform);
            }
            Err(e) => {
                self.count_error(&e);
                self.fail_photo(e.to_string());
            }
        }
        self.guard.exit();
    }

    fn handle_preview(&self, encoded: &EncodedRecord) {
        if self.guard.is_capturing() {
            // Acknowledge without presenting; the photo owns the next update.
            let mut release = ReleaseOnce::new(&*self.bridge, &self.stats, salvage_address(encoded));
            if let Err(e) = release.release_now() {
                warn!(error = %e, "Failed to release skipped preview buffer");
            }
            AtomicPipelineStats::bump(&self.stats.previews_skipped);
            return;
        }

        match self.accept(encoded) {
            Ok((record, bytes)) => {
                let transform = self.transform_for(&record);
                self.present(EventKind::Preview, &record, bytes, transform);
            }
            Err(e) => {
                self.count_error(&e);
                AtomicPipelineStats::bump(&self.stats.previews_rejected);
                warn!(error = %e, "Dropped preview frame");
            }
        }
    }

    /// Decode, validate, copy and release one record
    fn accept(&self, encoded: &EncodedRecord) -> Result<(TransferRecord, Vec<u8>)> {
        let mut release = ReleaseOnce::new(&*self.bridge, &self.stats, salvage_address(encoded));

        let record = TransferRecord::decode(encoded)?;
        validate_record(&record, &self.capture_config)?;

        let copied = self.bridge.read(record.address, record.byte_len());
        if let Err(e) = release.release_now() {
            if copied.is_ok() {
                // The bytes are ours already; report and carry on.
                warn!(address = %record.address, error = %e, "Release failed after copy");
            }
        }
        Ok((record, copied?))
    }

    fn transform_for(&self, record: &TransferRecord) -> OrientationTransform {
        derive_transform(
            record.kind,
            record.capture_orientation,
            record.image_orientation,
            self.device_orientation(),
            record.mirrored,
        )
    }

    /// Hand owned bytes to the dispatcher to update the texture for `kind`
    fn present(&self, kind: EventKind, record: &TransferRecord, bytes: Vec<u8>, transform: OrientationTransform) {
        let width = record.width as u32;
        let height = record.height as u32;
        let textures = Arc::clone(&self.textures);
        let events = self.events.clone();
        let stats = Arc::clone(&self.stats);
        let queue = self.queue.clone();

        let scheduled = self.queue.enqueue(move || {
            match textures.install(kind, width, height, &bytes, &queue) {
                Ok(texture) => {
                    let event = match kind {
                        EventKind::Photo => {
                            AtomicPipelineStats::bump(&stats.photos_captured);
                            CaptureEvent::PhotoCaptured {
                                texture,
                                width,
                                height,
                                transform,
                            }
                        }
                        EventKind::Preview => {
                            AtomicPipelineStats::bump(&stats.previews_presented);
                            CaptureEvent::PreviewTextureUpdated {
                                texture,
                                width,
                                height,
                                transform,
                            }
                        }
                    };
                    events.post(event);
                }
                Err(e) => {
                    error!(kind = kind.name(), error = %e, "Failed to update texture");
                    if kind == EventKind::Photo {
                        AtomicPipelineStats::bump(&stats.photos_failed);
                        events.post(CaptureEvent::PhotoCaptureFailed {
                            reason: e.to_string(),
                        });
                    }
                }
            }
        });

        if let Err(e) = scheduled {
            warn!(kind = kind.name(), error = %e, "Could not schedule texture update");
            if kind == EventKind::Photo {
                self.fail_photo(e.to_string());
            }
        }
    }

    fn fail_photo(&self, reason: String) {
        AtomicPipelineStats::bump(&self.stats.photos_failed);
        error!(%reason, "Photo capture failed");
        self.events.post(CaptureEvent::PhotoCaptureFailed { reason });
    }

    /// Fail the capture in flight if the native side cancelled it without
    /// getting the failure through
    fn collect_abandoned_photo(&self) {
        if self.bridge.take_abandoned_photo() && self.guard.exit() {
            self.fail_photo("camera stopped before the photo completed".into());
        }
    }

    fn count_error(&self, error: &DaguerreError) {
        match error.kind() {
            ErrorKind::Protocol => AtomicPipelineStats::bump(&self.stats.protocol_errors),
            ErrorKind::Validation => AtomicPipelineStats::bump(&self.stats.validation_errors),
            _ => {}
        }
    }

    fn handle_lifecycle(&self, lifecycle: LifecycleEvent) {
        let event = match lifecycle {
            LifecycleEvent::CameraInitialized => {
                self.camera_active.store(true, Ordering::Release);
                CaptureEvent::CameraInitialized
            }
            LifecycleEvent::PreviewPaused => {
                self.preview_paused.store(true, Ordering::Release);
                CaptureEvent::PreviewPaused
            }
            LifecycleEvent::PreviewResumed => {
                self.preview_paused.store(false, Ordering::Release);
                CaptureEvent::PreviewResumed
            }
            LifecycleEvent::CameraStopped => {
                self.camera_active.store(false, Ordering::Release);
                self.preview_paused.store(false, Ordering::Release);
                CaptureEvent::CameraStopped
            }
        };
        debug!(event = event.name(), "Lifecycle notification");
        self.events.post(event);
    }
}
