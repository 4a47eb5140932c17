//! End-to-end capture pipeline with a synthetic camera.
//!
//! The main thread owns the textures and runs the dispatcher; the pipeline
//! runner consumes native events on its own thread.

use std::{sync::Arc, time::Duration};

use daguerre::{
    BufferPool, CaptureEvent, CaptureStateMachine, DeviceOrientation, InMemoryTextureStore,
    MainThreadDispatcher, NativeCaptureSession, PipelineConfig, PipelineRunner, Result,
    SyntheticCamera,
};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_json_str(
        r#"{ "session": { "preview_interval_ms": 0, "event_channel_capacity": 8 } }"#,
    )?;

    let pool = Arc::new(BufferPool::new(config.pool.clone())?);
    let camera = SyntheticCamera::new();
    let (session, native_events) = NativeCaptureSession::new(
        config.session.clone(),
        config.capture,
        camera.device(),
        Arc::clone(&pool),
    )?;

    let dispatcher = MainThreadDispatcher::new();
    let store = InMemoryTextureStore::new();
    let machine = Arc::new(CaptureStateMachine::new(
        session.clone(),
        config.capture,
        dispatcher.queue(),
        Box::new(store.clone()),
    ));
    let runner = PipelineRunner::spawn(Arc::clone(&machine), native_events)?;
    let events = machine.events();

    session.initialize()?;
    session.start_preview()?;
    machine.set_device_orientation(DeviceOrientation::LandscapeLeft);

    let stride = WIDTH * 4;
    for _ in 0..5 {
        let data = camera.render_preview(WIDTH, HEIGHT, stride);
        session.deliver_preview(&SyntheticCamera::frame(&data, WIDTH, HEIGHT, stride));
        std::thread::sleep(Duration::from_millis(5));
    }

    machine.request_photo()?;
    // A second request while the first is in flight is refused
    if let Err(e) = machine.request_photo() {
        println!("Second request refused: {}", e);
    }
    session.deliver_photo(Ok(camera.render_photo(WIDTH, HEIGHT, 32 * 1024)));

    for _ in 0..20 {
        dispatcher.run_for(Duration::from_millis(20))?;
        for event in events.try_iter() {
            match event {
                CaptureEvent::PhotoCaptured { texture, width, height, transform } => println!(
                    "Photo {}x{} in {:?}, rotation {} scale {:?}",
                    width, height, texture, transform.rotation, transform.scale
                ),
                CaptureEvent::PreviewTextureUpdated { texture, transform, .. } => {
                    println!("Preview in {:?}, rotation {}", texture, transform.rotation)
                }
                other => println!("Event: {}", other.name()),
            }
        }
    }

    machine.shutdown();
    dispatcher.run_pending()?;
    runner.stop();

    println!("\n{}", pool.stats().summary());
    println!("{}", session.stats().summary());
    println!("{}", machine.stats().summary());
    println!("Live textures after shutdown: {}", store.live_count());
    Ok(())
}
