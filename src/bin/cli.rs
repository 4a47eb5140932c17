use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use daguerre::{
    session::PreviewOutcome, BufferPool, CaptureEvent, CaptureStateMachine, DaguerreError,
    DeviceOrientation, EncodedRecord, EventKind, InMemoryTextureStore, MainThreadDispatcher,
    NativeCaptureSession, PipelineConfig, PipelineRunner, Result, SyntheticCamera,
    TransferRecord,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "daguerre-sim", version, about = "Daguerre capture pipeline simulator")]
struct Cli {
    /// JSON pipeline configuration; defaults apply when omitted
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive a synthetic camera through the full pipeline
    Run(RunArgs),
    /// Print the effective configuration as JSON
    Config,
    /// Decode and validate a textual transfer record
    Decode {
        /// Treat the record as a preview rather than a photo
        #[arg(long)]
        preview: bool,
        /// Comma separated field list
        record: String,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Preview frames to deliver
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Photos to request, spread evenly over the run
    #[arg(short, long, default_value_t = 2)]
    photos: u32,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Delay between delivered frames
    #[arg(long, default_value_t = 33, value_name = "MS")]
    frame_interval_ms: u64,

    /// Photo payload size
    #[arg(long, default_value_t = 64 * 1024, value_name = "BYTES")]
    photo_bytes: usize,

    /// Rotate the simulated device through every orientation
    #[arg(long)]
    rotate: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Command::Run(args) => run(config, args),
        Command::Config => {
            println!("{}", config.to_json_string()?);
            Ok(())
        }
        Command::Decode { preview, record } => {
            let kind = if preview { EventKind::Preview } else { EventKind::Photo };
            decode(&config, kind, &record)
        }
    }
}

fn decode(config: &PipelineConfig, kind: EventKind, wire: &str) -> Result<()> {
    let encoded = EncodedRecord::parse(kind, wire)?;
    let record = TransferRecord::decode(&encoded)?;
    daguerre::transfer::validate_record(&record, &config.capture)?;
    println!("{:#?}", record);
    Ok(())
}

fn run(config: PipelineConfig, args: RunArgs) -> Result<()> {
    if args.width == 0 || args.height == 0 {
        return Err(DaguerreError::invalid_parameter("width", "Frame dimensions must be positive"));
    }

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
    info!(frames = args.frames, photos = args.photos, "Simulation started");

    let done = Arc::new(AtomicBool::new(false));
    let driver = {
        let done = Arc::clone(&done);
        let machine = Arc::clone(&machine);
        let session = Arc::clone(&session);
        let camera = camera.clone();
        thread::Builder::new()
            .name("daguerre-sim-camera".into())
            .spawn(move || {
                drive(&args, &camera, &session, &machine);
                done.store(true, Ordering::Release);
            })
            .map_err(|e| DaguerreError::dispatch(format!("failed to spawn camera thread: {}", e)))?
    };

    let mut presented = 0u64;
    let mut photos = 0u64;
    loop {
        dispatcher.run_for(Duration::from_millis(10))?;
        for event in events.try_iter() {
            match &event {
                CaptureEvent::PreviewTextureUpdated { .. } => presented += 1,
                CaptureEvent::PhotoCaptured { width, height, transform, .. } => {
                    photos += 1;
                    info!(width, height, rotation = transform.rotation, "Photo captured");
                }
                CaptureEvent::PhotoCaptureFailed { reason } => warn!(%reason, "Photo failed"),
                other => debug!(event = other.name(), "Pipeline event"),
            }
        }
        if done.load(Ordering::Acquire) && dispatcher.pending() == 0 && !machine.guard().is_capturing() {
            break;
        }
    }
    let _ = driver.join();

    machine.shutdown();
    dispatcher.run_pending()?;
    runner.stop();

    println!("previews presented: {}, photos captured: {}", presented, photos);
    println!("{}", pool.stats().summary());
    println!("{}", session.stats().summary());
    println!("{}", machine.stats().summary());
    println!(
        "textures: created {}, destroyed {}, live {}",
        store.created(),
        store.destroyed(),
        store.live_count()
    );
    Ok(())
}

/// Camera thread: feed frames and answer photo requests
fn drive(args: &RunArgs, camera: &SyntheticCamera, session: &NativeCaptureSession, machine: &CaptureStateMachine) {
    let stride = args.width * 4;
    let photo_every = if args.photos == 0 {
        u32::MAX
    } else {
        (args.frames / (args.photos + 1)).max(1)
    };
    let mut photos_left = args.photos;

    for frame_index in 1..=args.frames {
        if args.rotate && frame_index % 15 == 0 {
            let orientation = DeviceOrientation::ALL[(frame_index / 15) as usize % DeviceOrientation::ALL.len()];
            machine.set_device_orientation(orientation);
        }

        let data = camera.render_preview(args.width, args.height, stride);
        let outcome = session.deliver_preview(&SyntheticCamera::frame(&data, args.width, args.height, stride));
        if outcome == PreviewOutcome::Closed {
            break;
        }

        if photos_left > 0 && frame_index % photo_every == 0 {
            match machine.request_photo() {
                Ok(()) => {
                    photos_left -= 1;
                    session.deliver_photo(Ok(camera.render_photo(args.width, args.height, args.photo_bytes)));
                }
                Err(e) => debug!(error = %e, "Photo request rejected"),
            }
        }

        thread::sleep(Duration::from_millis(args.frame_interval_ms));
    }
}
