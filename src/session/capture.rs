//! Native side of the capture pipeline
//!
//! The session stages device output into pooled buffers, describes each
//! buffer with a transfer record and pushes it through a bounded channel.
//! Ownership passes to the consumer at publish time; only the consumer's
//! [`release`](NativeCaptureSession::release) returns a buffer to the pool.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::{
    buffers::{BufferAddress, BufferPool, MaintenanceHandle},
    error::{DaguerreError, Result},
    pipeline::DeviceOrientation,
    transfer::{
        CaptureOrientation, CustodyLedger, EncodedRecord, EventKind, ImageOrientation,
        TransferRecord,
    },
};

use super::{
    config::{CameraPosition, CaptureConfig, FlashMode, SessionConfig, WhiteBalanceMode},
    device::{CaptureDevice, CapturedPhoto, PreviewFrame},
    stats::{AtomicSessionStats, SessionStats},
    throttle::FrameThrottle,
};

/// Lifecycle notifications posted alongside capture records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    CameraInitialized,
    PreviewPaused,
    PreviewResumed,
    CameraStopped,
}

/// Message from the native session to the managed consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// A photo buffer was published
    Photo(EncodedRecord),
    /// The device failed to produce the requested photo
    PhotoFailed(String),
    /// A preview buffer was published
    Preview(EncodedRecord),
    Lifecycle(LifecycleEvent),
}

/// What became of one preview frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Published,
    Throttled,
    /// Preview paused or not started
    Paused,
    /// Consumer is behind; buffer returned to the pool
    ChannelFull,
    /// Frame could not be staged
    Failed,
    /// Session shut down or consumer gone
    Closed,
}

/// Owns the device session and the buffers it lends to the consumer
pub struct NativeCaptureSession {
    config: RwLock<SessionConfig>,
    capture_config: CaptureConfig,
    device: Mutex<Box<dyn CaptureDevice>>,
    pool: Arc<BufferPool>,
    ledger: CustodyLedger,
    throttle: FrameThrottle,
    events: Sender<NativeEvent>,
    capture_orientation: RwLock<CaptureOrientation>,
    photo_pending: AtomicBool,
    /// Set while a stop-time photo failure may not have reached the consumer
    photo_abandoned: AtomicBool,
    initialized: AtomicBool,
    running: AtomicBool,
    paused: AtomicBool,
    closed: AtomicBool,
    stats: AtomicSessionStats,
    maintenance: Mutex<Option<MaintenanceHandle>>,
}

impl std::fmt::Debug for NativeCaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCaptureSession")
            .field("camera_position", &self.camera_position())
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .field("closed", &self.is_closed())
            .field("outstanding", &self.outstanding_buffers())
            .finish()
    }
}

impl NativeCaptureSession {
    /// Create a session and the receiving end of its event channel
    pub fn new(
        config: SessionConfig,
        capture_config: CaptureConfig,
        device: Box<dyn CaptureDevice>,
        pool: Arc<BufferPool>,
    ) -> Result<(Arc<Self>, Receiver<NativeEvent>)> {
        config.validate()?;
        let (events, receiver) = bounded(config.event_channel_capacity);

        let maintenance = if pool.config().background_maintenance {
            Some(pool.start_maintenance()?)
        } else {
            None
        };

        info!(
            device = device.name(),
            position = ?config.camera_position,
            preview_interval_ms = config.preview_interval.as_millis() as u64,
            channel_capacity = config.event_channel_capacity,
            "Creating capture session"
        );

        let session = Arc::new(Self {
            throttle: FrameThrottle::new(config.preview_interval),
            config: RwLock::new(config),
            capture_config,
            device: Mutex::new(device),
            pool,
            ledger: CustodyLedger::new(),
            events,
            capture_orientation: RwLock::new(CaptureOrientation::Portrait),
            photo_pending: AtomicBool::new(false),
            photo_abandoned: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            stats: AtomicSessionStats::default(),
            maintenance: Mutex::new(maintenance),
        });
        Ok((session, receiver))
    }

    // Lifecycle

    /// Configure the device and announce the camera
    pub fn initialize(&self) -> Result<()> {
        self.ensure_open()?;
        {
            let config = self.config.read();
            self.device.lock().configure(&config)?;
        }
        self.initialized.store(true, Ordering::Release);
        info!("Camera initialized");
        self.notify(NativeEvent::Lifecycle(LifecycleEvent::CameraInitialized));
        Ok(())
    }

    /// Start streaming preview frames
    pub fn start_preview(&self) -> Result<()> {
        self.ensure_open()?;
        self.ensure_initialized()?;
        self.device.lock().start()?;
        self.paused.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
        debug!("Preview started");
        Ok(())
    }

    pub fn pause_preview(&self) -> Result<()> {
        self.ensure_open()?;
        self.paused.store(true, Ordering::Release);
        self.notify(NativeEvent::Lifecycle(LifecycleEvent::PreviewPaused));
        Ok(())
    }

    pub fn resume_preview(&self) -> Result<()> {
        self.ensure_open()?;
        self.paused.store(false, Ordering::Release);
        self.notify(NativeEvent::Lifecycle(LifecycleEvent::PreviewResumed));
        Ok(())
    }

    /// Stop the camera and reclaim every buffer still in custody.
    ///
    /// A photo that was requested but not delivered is reported as failed so
    /// the consumer's capture guard is released. Never waits longer than the
    /// notice timeout per notice, even when the event channel is full.
    /// Returns the number of buffers reclaimed.
    pub fn stop(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        let reclaimed = self.halt();
        self.announce_stop("camera stopped before the photo completed");
        info!(reclaimed, "Camera stopped");
        reclaimed
    }

    /// Stop, reclaim, and tear the pool down. Later callbacks are ignored.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let reclaimed = self.halt();
        self.announce_stop("capture session shut down");

        if let Some(handle) = self.maintenance.lock().take() {
            handle.stop();
        }
        let freed = self.pool.teardown();
        info!(reclaimed, freed, "Capture session shut down");
    }

    // Controls

    /// Toggle between front and back cameras
    pub fn switch_camera(&self) -> Result<CameraPosition> {
        self.ensure_open()?;
        let config = self.reconfigure(|config| {
            config.camera_position = config.camera_position.toggled();
        })?;
        if config.reset_throttle_on_switch {
            self.throttle.reset();
        }
        info!(position = ?config.camera_position, "Switched camera");
        Ok(config.camera_position)
    }

    pub fn set_white_balance_mode(&self, mode: WhiteBalanceMode) -> Result<()> {
        self.ensure_open()?;
        self.reconfigure(|config| config.white_balance = mode)?;
        debug!(?mode, "White balance mode set");
        Ok(())
    }

    /// Lock white balance at `kelvin`, clamped to the supported range.
    /// Returns the temperature applied.
    pub fn set_color_temperature(&self, kelvin: f32) -> Result<f32> {
        self.ensure_open()?;
        if !kelvin.is_finite() {
            return Err(DaguerreError::invalid_parameter(
                "kelvin",
                "Colour temperature must be a finite number",
            ));
        }
        let clamped = SessionConfig::clamp_temperature(kelvin);
        self.reconfigure(|config| {
            config.white_balance = WhiteBalanceMode::Locked;
            config.color_temperature = Some(clamped);
        })?;
        debug!(requested = kelvin, applied = clamped, "Colour temperature set");
        Ok(clamped)
    }

    /// Flash setting used for subsequent photos
    pub fn set_flash_mode(&self, mode: FlashMode) -> Result<()> {
        self.ensure_open()?;
        self.config.write().flash = mode;
        Ok(())
    }

    /// Track the device orientation; later records carry the matching
    /// capture orientation
    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        let capture = orientation.to_capture_orientation();
        *self.capture_orientation.write() = capture;
        trace!(?orientation, ?capture, "Device orientation changed");
    }

    // Photo path

    /// Ask the device for a photo. Only one may be in flight.
    pub fn request_photo(&self) -> Result<()> {
        self.ensure_open()?;
        self.ensure_initialized()?;
        if self
            .photo_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DaguerreError::state_conflict("Photo capture already in progress"));
        }
        AtomicSessionStats::bump(&self.stats.photos_requested);

        let flash = self.config.read().flash;
        if let Err(e) = self.device.lock().trigger_photo(flash) {
            self.photo_pending.store(false, Ordering::Release);
            return Err(e);
        }
        debug!(?flash, "Photo requested");
        Ok(())
    }

    /// Platform callback: a photo finished, successfully or not.
    ///
    /// Ignored unless a request is pending; a request cancelled by `stop`
    /// has already been reported as failed.
    pub fn deliver_photo(&self, result: std::result::Result<CapturedPhoto, String>) {
        if self.is_closed() {
            debug!("Ignoring photo delivered after shutdown");
            return;
        }
        if !self.photo_pending.swap(false, Ordering::AcqRel) {
            warn!("Ignoring photo delivered without a pending request");
            return;
        }

        let outcome = match result {
            Ok(photo) => self.publish_photo(&photo),
            Err(reason) => Err(DaguerreError::device(reason)),
        };
        if let Err(e) = outcome {
            AtomicSessionStats::bump(&self.stats.photo_failures);
            error!(error = %e, "Photo capture failed");
            self.emit(NativeEvent::PhotoFailed(e.to_string()));
        }
    }

    fn publish_photo(&self, photo: &CapturedPhoto) -> Result<()> {
        if photo.data.is_empty() {
            return Err(DaguerreError::device("device produced an empty photo"));
        }
        let address = self.stage(EventKind::Photo, &photo.data)?;
        let (capture, mirrored) = self.current_orientation();
        let record = TransferRecord::photo(
            address,
            photo.width,
            photo.height,
            photo.data.len(),
            capture,
            ImageOrientation::for_capture(capture, mirrored),
            mirrored,
        );

        if !self.emit(NativeEvent::Photo(record.encode())) {
            self.reclaim(address);
            return Err(DaguerreError::session_closed("photo consumer has gone away"));
        }
        AtomicSessionStats::bump(&self.stats.photos_published);
        debug!(%address, len = photo.data.len(), "Photo published");
        Ok(())
    }

    // Preview path

    /// Platform callback: a raw preview frame is available.
    ///
    /// The pause and throttle checks run before any buffer is acquired.
    pub fn deliver_preview(&self, frame: &PreviewFrame<'_>) -> PreviewOutcome {
        if self.is_closed() {
            return PreviewOutcome::Closed;
        }
        AtomicSessionStats::bump(&self.stats.previews_offered);

        if !self.is_running() || self.is_paused() {
            AtomicSessionStats::bump(&self.stats.previews_paused);
            return PreviewOutcome::Paused;
        }
        if !self.throttle.admit() {
            AtomicSessionStats::bump(&self.stats.previews_throttled);
            return PreviewOutcome::Throttled;
        }

        let length = match frame.byte_len() {
            Some(length) if length > 0 && length <= frame.data.len() => length,
            _ => {
                AtomicSessionStats::bump(&self.stats.preview_failures);
                warn!(
                    width = frame.width,
                    height = frame.height,
                    bytes_per_row = frame.bytes_per_row,
                    available = frame.data.len(),
                    "Preview frame shorter than its geometry"
                );
                return PreviewOutcome::Failed;
            }
        };

        let address = match self.stage(EventKind::Preview, &frame.data[..length]) {
            Ok(address) => address,
            Err(e) => {
                AtomicSessionStats::bump(&self.stats.preview_failures);
                warn!(error = %e, "Failed to stage preview frame");
                return PreviewOutcome::Failed;
            }
        };

        let (capture, mirrored) = self.current_orientation();
        let record = TransferRecord::preview(
            address,
            frame.width,
            frame.height,
            frame.bytes_per_row,
            length,
            capture,
            ImageOrientation::for_capture(capture, mirrored),
            mirrored,
        );

        match self.events.try_send(NativeEvent::Preview(record.encode())) {
            Ok(()) => {
                AtomicSessionStats::bump(&self.stats.previews_published);
                trace!(%address, length, "Preview published");
                PreviewOutcome::Published
            }
            Err(TrySendError::Full(_)) => {
                self.reclaim(address);
                AtomicSessionStats::bump(&self.stats.previews_channel_full);
                debug!(%address, "Event channel full, dropped preview frame");
                PreviewOutcome::ChannelFull
            }
            Err(TrySendError::Disconnected(_)) => {
                self.reclaim(address);
                PreviewOutcome::Closed
            }
        }
    }

    // Consumer side

    /// Copy the first `len` bytes of a published buffer
    pub fn read(&self, address: BufferAddress, len: usize) -> Result<Vec<u8>> {
        self.ledger.with_published(address, |entry| {
            if len > entry.length {
                return Err(DaguerreError::invalid_parameter(
                    "len",
                    format!("buffer holds {} bytes, asked for {}", entry.length, len),
                ));
            }
            self.pool.read(address, len)
        })
    }

    /// Return a published buffer to the pool. Exactly once per address.
    pub fn release(&self, address: BufferAddress) -> Result<()> {
        if self.is_closed() {
            return Err(DaguerreError::session_closed("capture session is shut down"));
        }
        self.ledger.release(address, |_| self.pool.release(address))?;
        AtomicSessionStats::bump(&self.stats.releases);
        Ok(())
    }

    /// Drop every idle pooled buffer
    pub fn trim(&self) -> usize {
        self.pool.trim()
    }

    // Queries

    pub fn camera_position(&self) -> CameraPosition {
        self.config.read().camera_position
    }

    pub fn config(&self) -> SessionConfig {
        self.config.read().clone()
    }

    pub fn capture_config(&self) -> &CaptureConfig {
        &self.capture_config
    }

    pub fn capture_orientation(&self) -> CaptureOrientation {
        *self.capture_orientation.read()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether a photo cancelled by `stop` or `shutdown` still needs
    /// reporting to the consumer. Clears the flag.
    pub fn take_abandoned_photo(&self) -> bool {
        self.photo_abandoned.swap(false, Ordering::AcqRel)
    }

    pub fn is_photo_pending(&self) -> bool {
        self.photo_pending.load(Ordering::Acquire)
    }

    /// Buffers lent or published and not yet released
    pub fn outstanding_buffers(&self) -> usize {
        self.ledger.outstanding()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    // Private helper methods

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DaguerreError::session_closed("capture session is shut down"));
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(DaguerreError::device("camera is not initialized"));
        }
        Ok(())
    }

    fn current_orientation(&self) -> (CaptureOrientation, bool) {
        (self.capture_orientation(), self.camera_position().is_mirrored())
    }

    /// Apply a settings change to the device, committing it only on success
    fn reconfigure(&self, change: impl FnOnce(&mut SessionConfig)) -> Result<SessionConfig> {
        let mut config = self.config.write();
        let mut updated = config.clone();
        change(&mut updated);
        if self.initialized.load(Ordering::Acquire) {
            self.device.lock().configure(&updated)?;
        }
        *config = updated.clone();
        Ok(updated)
    }

    /// Acquire, fill and publish a buffer holding `bytes`
    fn stage(&self, kind: EventKind, bytes: &[u8]) -> Result<BufferAddress> {
        let lease = self.pool.acquire(bytes.len())?;
        let address = lease.address;

        if let Err(e) = self.ledger.lend(address, kind, bytes.len()) {
            self.roll_back(address);
            return Err(e);
        }
        if let Err(e) = self.pool.write(address, 0, bytes) {
            self.ledger.abandon(address);
            self.roll_back(address);
            return Err(e);
        }
        self.ledger.publish(address)?;
        Ok(address)
    }

    /// Return a buffer that never made it into the ledger
    fn roll_back(&self, address: BufferAddress) {
        if let Err(e) = self.pool.release(address) {
            warn!(%address, error = %e, "Failed to return unstaged buffer");
        }
    }

    /// Take back a published buffer the consumer never saw
    fn reclaim(&self, address: BufferAddress) {
        if let Err(e) = self.ledger.release(address, |_| self.pool.release(address)) {
            warn!(%address, error = %e, "Failed to reclaim unsent buffer");
        }
    }

    fn halt(&self) -> usize {
        self.device.lock().stop();
        self.running.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.initialized.store(false, Ordering::Release);

        let mut reclaimed = 0;
        for (address, entry) in self.ledger.drain() {
            match self.pool.release(address) {
                Ok(()) => reclaimed += 1,
                Err(e) => warn!(%address, kind = entry.kind.name(), error = %e, "Force release failed"),
            }
        }
        AtomicSessionStats::add(&self.stats.force_releases, reclaimed);
        reclaimed
    }

    /// Report the pending photo as failed and announce the stop.
    ///
    /// The abandoned flag is raised before the failure notice is offered and
    /// cleared once it is queued, so a consumer that drains the channel in
    /// between still finds the failure through [`take_abandoned_photo`].
    ///
    /// [`take_abandoned_photo`]: Self::take_abandoned_photo
    fn announce_stop(&self, reason: &str) {
        if self.photo_pending.swap(false, Ordering::AcqRel) {
            self.photo_abandoned.store(true, Ordering::Release);
            if self.notify(NativeEvent::PhotoFailed(reason.into())) {
                self.photo_abandoned.store(false, Ordering::Release);
            } else {
                warn!(reason, "Photo failure left for the consumer to collect");
            }
        }
        self.notify(NativeEvent::Lifecycle(LifecycleEvent::CameraStopped));
    }

    /// Blocking send for photo outcomes, which must not be dropped
    fn emit(&self, event: NativeEvent) -> bool {
        match self.events.send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("Event consumer has gone away");
                false
            }
        }
    }

    /// Bounded send for lifecycle notices; gives up after the notice timeout
    fn notify(&self, event: NativeEvent) -> bool {
        let timeout = self.config.read().notice_timeout;
        match self.events.send_timeout(event, timeout) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(event)) => {
                AtomicSessionStats::bump(&self.stats.notices_dropped);
                warn!(?event, timeout_ms = timeout.as_millis() as u64, "Event channel full, dropped notice");
                false
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                debug!("Event consumer has gone away");
                false
            }
        }
    }
}

impl Drop for NativeCaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
