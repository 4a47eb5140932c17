//! Capture state machine tests
//! Single-flight capture, exactly-once release, texture replacement and shutdown

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use daguerre::{
    pipeline::TextureSet, BufferAddress, BufferPool, BufferPoolConfigBuilder, CameraBridge,
    CaptureConfig, CaptureEvent, CaptureOrientation, CaptureState, CaptureStateMachine,
    DaguerreError, DeviceOrientation, EncodedRecord, ErrorKind, EventKind, ImageOrientation,
    InMemoryTextureStore, LifecycleEvent, MainThreadDispatcher, NativeCaptureSession,
    NativeEvent, PipelineRunner, PreviewOutcome, Result, SessionConfig, SyntheticCamera, TransferRecord,
};

/// Bridge that serves staged bytes and records every release
#[derive(Debug, Default)]
struct RecordingBridge {
    buffers: Mutex<HashMap<BufferAddress, Vec<u8>>>,
    releases: Mutex<Vec<BufferAddress>>,
    orientations: Mutex<Vec<DeviceOrientation>>,
    photo_requests: AtomicUsize,
    reject_requests: AtomicBool,
    fail_release: AtomicBool,
    trims: AtomicUsize,
    shutdowns: AtomicUsize,
    next_address: AtomicUsize,
    abandoned: AtomicBool,
}

impl RecordingBridge {
    fn stage(&self, bytes: Vec<u8>) -> BufferAddress {
        let raw = 0x10_0000 + self.next_address.fetch_add(1, Ordering::SeqCst) * 0x1000;
        let address = BufferAddress::from_raw(raw);
        self.buffers.lock().insert(address, bytes);
        address
    }

    fn release_count(&self, address: BufferAddress) -> usize {
        self.releases.lock().iter().filter(|&&a| a == address).count()
    }

    fn total_releases(&self) -> usize {
        self.releases.lock().len()
    }
}

impl CameraBridge for RecordingBridge {
    fn request_photo(&self) -> Result<()> {
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(DaguerreError::device("no photo output"));
        }
        self.photo_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, address: BufferAddress, len: usize) -> Result<Vec<u8>> {
        let buffers = self.buffers.lock();
        let bytes = buffers
            .get(&address)
            .ok_or_else(|| DaguerreError::custody(address.as_usize(), "read after release"))?;
        Ok(bytes[..len.min(bytes.len())].to_vec())
    }

    fn release(&self, address: BufferAddress) -> Result<()> {
        self.releases.lock().push(address);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(DaguerreError::device("release refused"));
        }
        self.buffers
            .lock()
            .remove(&address)
            .map(|_| ())
            .ok_or_else(|| DaguerreError::custody(address.as_usize(), "released twice"))
    }

    fn set_device_orientation(&self, orientation: DeviceOrientation) {
        self.orientations.lock().push(orientation);
    }

    fn trim(&self) -> usize {
        self.trims.fetch_add(1, Ordering::SeqCst);
        3
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn take_abandoned_photo(&self) -> bool {
        self.abandoned.swap(false, Ordering::SeqCst)
    }
}

/// Real session with a tiny event channel, driven by hand
struct CongestedSession {
    session: Arc<NativeCaptureSession>,
    native: crossbeam_channel::Receiver<NativeEvent>,
    camera: SyntheticCamera,
    dispatcher: MainThreadDispatcher,
    machine: CaptureStateMachine,
}

impl CongestedSession {
    fn new() -> Self {
        let pool_config = BufferPoolConfigBuilder::new().manual_maintenance().build().unwrap();
        let pool = Arc::new(BufferPool::new(pool_config).unwrap());
        let camera = SyntheticCamera::new();
        let (session, native) = NativeCaptureSession::new(
            SessionConfig::new()
                .with_preview_interval(Duration::ZERO)
                .with_event_channel_capacity(2)
                .with_notice_timeout(Duration::from_millis(20)),
            CaptureConfig::default(),
            camera.device(),
            pool,
        )
        .unwrap();
        let dispatcher = MainThreadDispatcher::new();
        let machine = CaptureStateMachine::new(
            session.clone(),
            CaptureConfig::default(),
            dispatcher.queue(),
            Box::new(InMemoryTextureStore::new()),
        );
        let harness = Self {
            session,
            native,
            camera,
            dispatcher,
            machine,
        };
        harness.session.initialize().unwrap();
        harness.session.start_preview().unwrap();
        harness.pump();
        harness
    }

    /// Request a photo, then fill the channel with previews nobody reads
    fn capture_into_full_channel(&self) {
        self.machine.request_photo().unwrap();
        for _ in 0..2 {
            let data = self.camera.render_preview(16, 8, 64);
            assert_eq!(
                self.session.deliver_preview(&SyntheticCamera::frame(&data, 16, 8, 64)),
                PreviewOutcome::Published
            );
        }
    }

    /// Feed every queued native event to the machine and run dispatched work
    fn pump(&self) -> Vec<CaptureEvent> {
        for event in self.native.try_iter() {
            self.machine.handle_native_event(event);
        }
        self.dispatcher.run_pending().unwrap();
        self.machine.events().try_iter().collect()
    }
}

fn failures(events: &[CaptureEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CaptureEvent::PhotoCaptureFailed { .. }))
        .count()
}

struct Fixture {
    bridge: Arc<RecordingBridge>,
    dispatcher: MainThreadDispatcher,
    store: InMemoryTextureStore,
    machine: CaptureStateMachine,
}

impl Fixture {
    fn new() -> Self {
        let bridge = Arc::new(RecordingBridge::default());
        let dispatcher = MainThreadDispatcher::new();
        let store = InMemoryTextureStore::new();
        let machine = CaptureStateMachine::new(
            bridge.clone(),
            CaptureConfig::default(),
            dispatcher.queue(),
            Box::new(store.clone()),
        );
        Self {
            bridge,
            dispatcher,
            store,
            machine,
        }
    }

    fn photo_event(&self, bytes: Vec<u8>) -> (BufferAddress, NativeEvent) {
        let len = bytes.len();
        let address = self.bridge.stage(bytes);
        let record = TransferRecord::photo(
            address,
            64,
            48,
            len,
            CaptureOrientation::Portrait,
            ImageOrientation::Right,
            false,
        );
        (address, NativeEvent::Photo(record.encode()))
    }

    fn preview_event(&self, width: u32, height: u32) -> (BufferAddress, NativeEvent) {
        let stride = width * 4;
        let bytes = vec![0x40u8; (stride * height) as usize];
        let address = self.bridge.stage(bytes.clone());
        let record = TransferRecord::preview(
            address,
            width,
            height,
            stride,
            bytes.len(),
            CaptureOrientation::Portrait,
            ImageOrientation::Right,
            false,
        );
        (address, NativeEvent::Preview(record.encode()))
    }

    /// Run dispatched work and collect application events
    fn settle(&self) -> Vec<CaptureEvent> {
        self.dispatcher.run_pending().unwrap();
        self.machine.events().try_iter().collect()
    }
}

#[cfg(test)]
mod capture_pipeline_tests {
    use super::*;

    /// Test: A photo is copied, released once, and presented as a texture
    #[test]
    fn test_photo_captured() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();
        assert_eq!(fx.machine.capture_state(), CaptureState::Capturing);

        let (address, event) = fx.photo_event(vec![7u8; 500]);
        fx.machine.handle_native_event(event);
        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);
        assert_eq!(fx.bridge.release_count(address), 1);

        match fx.settle().as_slice() {
            [CaptureEvent::PhotoCaptured { texture, width, height, transform }] => {
                assert_eq!((*width, *height), (64, 48));
                assert_eq!(transform.rotation, 90);
                assert_eq!(transform.scale, [-1.0, 1.0, 1.0]);
                assert!(!transform.mirrored);
                assert_eq!(fx.store.texture(*texture).unwrap().data, vec![7u8; 500]);
            }
            other => panic!("unexpected events {:?}", other),
        }
        assert_eq!(fx.machine.stats().photos_captured, 1);
    }

    /// Test: A second request during a capture is rejected synchronously
    #[test]
    fn test_second_request_rejected() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();

        let err = fx.machine.request_photo().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(fx.machine.capture_state(), CaptureState::Capturing);
        assert_eq!(fx.bridge.photo_requests.load(Ordering::SeqCst), 1);
        assert_eq!(fx.machine.stats().requests_rejected, 1);
    }

    /// Test: Previews during a capture are released and never presented
    #[test]
    fn test_preview_during_capture_released_not_presented() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();

        let (address, event) = fx.preview_event(16, 8);
        fx.machine.handle_native_event(event);

        assert_eq!(fx.bridge.release_count(address), 1);
        let events = fx.settle();
        assert!(!events
            .iter()
            .any(|e| matches!(e, CaptureEvent::PreviewTextureUpdated { .. })));
        assert_eq!(fx.store.created(), 0);
        assert_eq!(fx.machine.stats().previews_skipped, 1);
    }

    /// Test: Idle previews are presented with the device-relative rotation
    #[test]
    fn test_preview_presented_with_orientation() {
        let fx = Fixture::new();

        let (address, event) = fx.preview_event(16, 8);
        fx.machine.handle_native_event(event);
        assert_eq!(fx.bridge.release_count(address), 1);
        match fx.settle().as_slice() {
            [CaptureEvent::PreviewTextureUpdated { transform, width, .. }] => {
                assert_eq!(*width, 16);
                assert_eq!(transform.rotation, 90);
            }
            other => panic!("unexpected events {:?}", other),
        }

        fx.machine.set_device_orientation(DeviceOrientation::LandscapeLeft);
        assert_eq!(*fx.bridge.orientations.lock(), vec![DeviceOrientation::LandscapeLeft]);

        let (_, event) = fx.preview_event(16, 8);
        fx.machine.handle_native_event(event);
        match fx.settle().as_slice() {
            [CaptureEvent::PreviewTextureUpdated { transform, .. }] => {
                assert_eq!(transform.rotation, 180);
                assert_eq!(transform.scale, [1.0, -1.0, 1.0]);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    /// Test: A malformed photo record fails the capture and still releases
    #[test]
    fn test_malformed_photo_fails_and_releases() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();

        let (address, event) = fx.photo_event(vec![1u8; 100]);
        let truncated = match event {
            NativeEvent::Photo(encoded) => {
                let mut fields = encoded.fields().to_vec();
                fields.truncate(5);
                EncodedRecord::new(EventKind::Photo, fields)
            }
            _ => unreachable!(),
        };
        fx.machine.handle_native_event(NativeEvent::Photo(truncated));

        assert_eq!(fx.bridge.release_count(address), 1);
        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);
        assert!(matches!(
            fx.settle().as_slice(),
            [CaptureEvent::PhotoCaptureFailed { .. }]
        ));
        assert_eq!(fx.machine.stats().protocol_errors, 1);
    }

    /// Test: An all-zero photo payload is a validation failure
    #[test]
    fn test_blank_photo_rejected() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();

        let (address, event) = fx.photo_event(vec![0u8; 256]);
        fx.machine.handle_native_event(event);

        assert_eq!(fx.bridge.release_count(address), 1);
        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);
        assert!(matches!(
            fx.settle().as_slice(),
            [CaptureEvent::PhotoCaptureFailed { .. }]
        ));
        assert_eq!(fx.machine.stats().validation_errors, 1);
        assert_eq!(fx.store.created(), 0);
    }

    /// Test: A preview with an inconsistent length is dropped silently
    #[test]
    fn test_corrupt_preview_dropped() {
        let fx = Fixture::new();
        let address = fx.bridge.stage(vec![1u8; 100]);
        let record = TransferRecord::preview(
            address,
            16,
            8,
            64,
            100,
            CaptureOrientation::Portrait,
            ImageOrientation::Right,
            false,
        );
        fx.machine.handle_native_event(NativeEvent::Preview(record.encode()));

        assert_eq!(fx.bridge.release_count(address), 1);
        assert!(fx.settle().is_empty());
        let stats = fx.machine.stats();
        assert_eq!(stats.previews_rejected, 1);
        assert_eq!(stats.protocol_errors, 1);
    }

    /// Test: Every entry into Capturing is matched by exactly one exit
    #[test]
    fn test_guard_transitions_balanced() {
        let fx = Fixture::new();

        for round in 0..5 {
            fx.machine.request_photo().unwrap();
            let event = if round % 2 == 0 {
                fx.photo_event(vec![3u8; 64]).1
            } else {
                NativeEvent::PhotoFailed("device error".into())
            };
            fx.machine.handle_native_event(event);
            assert_eq!(fx.machine.guard().entries(), fx.machine.guard().exits());
        }
        assert_eq!(fx.machine.guard().entries(), 5);
        fx.settle();
    }

    /// Test: A failed native request leaves the guard idle
    #[test]
    fn test_bridge_request_failure_resets_guard() {
        let fx = Fixture::new();
        fx.bridge.reject_requests.store(true, Ordering::SeqCst);

        let err = fx.machine.request_photo().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);

        fx.bridge.reject_requests.store(false, Ordering::SeqCst);
        fx.machine.request_photo().unwrap();
    }

    /// Test: A release failure after the copy does not fail the photo
    #[test]
    fn test_release_failure_after_copy_tolerated() {
        let fx = Fixture::new();
        fx.bridge.fail_release.store(true, Ordering::SeqCst);
        fx.machine.request_photo().unwrap();

        let (address, event) = fx.photo_event(vec![9u8; 128]);
        fx.machine.handle_native_event(event);

        assert_eq!(fx.bridge.release_count(address), 1);
        assert!(matches!(
            fx.settle().as_slice(),
            [CaptureEvent::PhotoCaptured { .. }]
        ));
        assert_eq!(fx.machine.stats().release_failures, 1);
    }

    /// Test: Same-size updates reuse the texture; a resize defers destruction
    #[test]
    fn test_texture_replacement_deferred() {
        let dispatcher = MainThreadDispatcher::new();
        let store = InMemoryTextureStore::new();
        let textures = Arc::new(TextureSet::new(Box::new(store.clone())));
        let queue = dispatcher.queue();

        let first = textures.install(EventKind::Preview, 4, 4, &[1; 64], &queue).unwrap();
        let same = textures.install(EventKind::Preview, 4, 4, &[2; 64], &queue).unwrap();
        assert_eq!(first, same);
        assert_eq!(store.created(), 1);
        assert_eq!(store.uploads(), 2);

        let resized = textures.install(EventKind::Preview, 8, 4, &[3; 128], &queue).unwrap();
        assert_ne!(first, resized);
        assert_eq!(textures.slot(EventKind::Preview).current().unwrap().handle, resized);
        // Old texture survives until the owner thread gets to it
        assert!(store.contains(first));
        assert_eq!(dispatcher.pending(), 1);

        dispatcher.run_pending().unwrap();
        assert!(!store.contains(first));
        assert!(store.contains(resized));
        assert_eq!(store.live_count(), 1);
    }

    /// Test: Low memory is forwarded as a trim of the native pool
    #[test]
    fn test_low_memory_trims() {
        let fx = Fixture::new();
        assert_eq!(fx.machine.handle_low_memory(), 3);
        assert_eq!(fx.bridge.trims.load(Ordering::SeqCst), 1);
    }

    /// Test: Lifecycle notifications update state and reach the application
    #[test]
    fn test_lifecycle_events() {
        let fx = Fixture::new();
        fx.machine
            .handle_native_event(NativeEvent::Lifecycle(LifecycleEvent::CameraInitialized));
        fx.machine
            .handle_native_event(NativeEvent::Lifecycle(LifecycleEvent::PreviewPaused));
        assert!(fx.machine.is_camera_active());
        assert!(fx.machine.is_preview_paused());

        fx.machine
            .handle_native_event(NativeEvent::Lifecycle(LifecycleEvent::CameraStopped));
        assert!(!fx.machine.is_camera_active());
        assert!(!fx.machine.is_preview_paused());

        let names: Vec<_> = fx.settle().iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), 3);
    }

    /// Test: Shutdown fails the pending photo and ignores later events
    #[test]
    fn test_shutdown_ignores_late_events() {
        let fx = Fixture::new();
        let (_, event) = fx.preview_event(16, 8);
        fx.machine.handle_native_event(event);
        fx.machine.request_photo().unwrap();
        fx.dispatcher.run_pending().unwrap();
        assert_eq!(fx.store.live_count(), 1);

        fx.machine.shutdown();
        assert!(fx.machine.is_quitting());
        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);
        assert_eq!(fx.bridge.shutdowns.load(Ordering::SeqCst), 1);

        let releases_before = fx.bridge.total_releases();
        let (_, late) = fx.photo_event(vec![5u8; 32]);
        fx.machine.handle_native_event(late);
        assert_eq!(fx.bridge.total_releases(), releases_before);
        assert_eq!(fx.machine.stats().late_events, 1);

        let events = fx.settle();
        assert!(events
            .iter()
            .any(|e| matches!(e, CaptureEvent::PhotoCaptureFailed { .. })));
        assert_eq!(fx.store.live_count(), 0);

        assert_eq!(fx.machine.request_photo().unwrap_err().kind(), ErrorKind::SessionClosed);
        fx.machine.shutdown();
        assert_eq!(fx.bridge.shutdowns.load(Ordering::SeqCst), 1);
    }

    /// Test: Native session, runner and state machine together
    #[test]
    fn test_end_to_end_with_runner() {
        let pool_config = BufferPoolConfigBuilder::new().manual_maintenance().build().unwrap();
        let pool = Arc::new(BufferPool::new(pool_config).unwrap());
        let camera = SyntheticCamera::new();
        let (session, native_events) = NativeCaptureSession::new(
            SessionConfig::new()
                .with_preview_interval(Duration::ZERO)
                .with_event_channel_capacity(8),
            CaptureConfig::default(),
            camera.device(),
            Arc::clone(&pool),
        )
        .unwrap();

        let dispatcher = MainThreadDispatcher::new();
        let store = InMemoryTextureStore::new();
        let machine = Arc::new(CaptureStateMachine::new(
            session.clone(),
            CaptureConfig::default(),
            dispatcher.queue(),
            Box::new(store.clone()),
        ));
        let runner = PipelineRunner::spawn(Arc::clone(&machine), native_events).unwrap();
        let events = machine.events();

        session.initialize().unwrap();
        session.start_preview().unwrap();

        let data = camera.render_preview(32, 8, 128);
        session.deliver_preview(&SyntheticCamera::frame(&data, 32, 8, 128));
        machine.request_photo().unwrap();
        session.deliver_photo(Ok(camera.render_photo(32, 8, 4096)));

        let mut captured = false;
        let deadline = Instant::now() + Duration::from_secs(5);
        while !captured && Instant::now() < deadline {
            dispatcher.run_for(Duration::from_millis(10)).unwrap();
            captured = events
                .try_iter()
                .any(|e| matches!(e, CaptureEvent::PhotoCaptured { .. }));
        }
        assert!(captured);

        // Both buffers were handed back by the consumer
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.outstanding_buffers() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(session.outstanding_buffers(), 0);
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(session.stats().releases, 2);

        machine.shutdown();
        dispatcher.run_pending().unwrap();
        runner.stop();
        assert!(pool.is_torn_down());
        assert_eq!(store.live_count(), 0);
    }

    /// Test: Session shutdown with a congested channel still ends the capture once
    #[test]
    fn test_session_shutdown_with_full_channel_fails_capture() {
        let harness = CongestedSession::new();
        harness.capture_into_full_channel();

        let started = Instant::now();
        harness.session.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(harness.session.stats().notices_dropped, 2);

        let events = harness.pump();
        assert_eq!(harness.machine.capture_state(), CaptureState::Idle);
        assert_eq!(harness.machine.guard().entries(), 1);
        assert_eq!(harness.machine.guard().exits(), 1);
        assert_eq!(failures(&events), 1);

        assert_eq!(
            harness.machine.request_photo().unwrap_err().kind(),
            ErrorKind::SessionClosed
        );
        assert_eq!(harness.machine.capture_state(), CaptureState::Idle);
        assert_eq!(failures(&harness.pump()), 0);
    }

    /// Test: Stopping with a congested channel frees the guard for the next photo
    #[test]
    fn test_session_stop_with_full_channel_fails_capture() {
        let harness = CongestedSession::new();
        harness.capture_into_full_channel();

        assert_eq!(harness.session.stop(), 2);
        let events = harness.pump();
        assert_eq!(harness.machine.capture_state(), CaptureState::Idle);
        assert_eq!(failures(&events), 1);
        assert_eq!(harness.machine.stats().photos_failed, 1);

        // The camera comes back and captures normally
        harness.session.initialize().unwrap();
        harness.session.start_preview().unwrap();
        harness.pump();
        harness.machine.request_photo().unwrap();
        harness
            .session
            .deliver_photo(Ok(harness.camera.render_photo(16, 8, 1024)));
        let events = harness.pump();
        assert!(events
            .iter()
            .any(|e| matches!(e, CaptureEvent::PhotoCaptured { .. })));
        assert_eq!(failures(&events), 0);
        assert_eq!(harness.machine.guard().entries(), harness.machine.guard().exits());

        harness.session.shutdown();
    }

    /// Test: A stop notice that did get through is not reported twice
    #[test]
    fn test_stop_failure_reported_once() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();

        // Cancelled natively, then the failure notice also arrives
        fx.bridge.abandoned.store(true, Ordering::SeqCst);
        fx.machine
            .handle_native_event(NativeEvent::PhotoFailed("camera stopped".into()));
        fx.machine
            .handle_native_event(NativeEvent::Lifecycle(LifecycleEvent::CameraStopped));

        assert_eq!(fx.machine.capture_state(), CaptureState::Idle);
        assert_eq!(fx.machine.guard().exits(), 1);
        assert_eq!(failures(&fx.settle()), 1);
    }

    /// Test: An abandoned capture is collected by the next request
    #[test]
    fn test_abandoned_capture_collected_on_request() {
        let fx = Fixture::new();
        fx.machine.request_photo().unwrap();
        fx.bridge.abandoned.store(true, Ordering::SeqCst);

        fx.machine.request_photo().unwrap();
        assert_eq!(fx.machine.capture_state(), CaptureState::Capturing);
        assert_eq!(fx.machine.guard().entries(), 2);
        assert_eq!(fx.machine.guard().exits(), 1);
        assert_eq!(fx.bridge.photo_requests.load(Ordering::SeqCst), 2);
        assert_eq!(failures(&fx.settle()), 1);
    }

    /// Test: The runner fails an in-flight capture when the native stream closes
    #[test]
    fn test_runner_disconnect_fails_capture() {
        let bridge = Arc::new(RecordingBridge::default());
        let dispatcher = MainThreadDispatcher::new();
        let machine = Arc::new(CaptureStateMachine::new(
            bridge,
            CaptureConfig::default(),
            dispatcher.queue(),
            Box::new(InMemoryTextureStore::new()),
        ));
        let (native_tx, native_rx) = crossbeam_channel::bounded::<NativeEvent>(2);
        let runner = PipelineRunner::spawn(Arc::clone(&machine), native_rx).unwrap();
        let events = machine.events();

        machine.request_photo().unwrap();
        drop(native_tx);

        let deadline = Instant::now() + Duration::from_secs(5);
        while machine.capture_state() == CaptureState::Capturing && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(machine.capture_state(), CaptureState::Idle);
        assert!(!machine.is_camera_active());
        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(failures(&received), 1);
        runner.stop();
    }

    /// Test: An application that never drains events does not grow the backlog
    #[test]
    fn test_undrained_event_stream_is_bounded() {
        let fx = Fixture::new();
        for _ in 0..200 {
            let (_, event) = fx.preview_event(8, 8);
            fx.machine.handle_native_event(event);
        }
        fx.machine.request_photo().unwrap();
        let (_, photo) = fx.photo_event(vec![9u8; 64]);
        fx.machine.handle_native_event(photo);
        fx.dispatcher.run_pending().unwrap();

        let events: Vec<_> = fx.machine.events().try_iter().collect();
        assert!(events.len() <= 64);
        assert!(fx.machine.stats().events_dropped > 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, CaptureEvent::PhotoCaptured { .. })));
    }
}
