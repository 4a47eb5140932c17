//! Basic usage of the Daguerre buffer pool and transfer records

use std::time::Duration;

use daguerre::{
    BufferPool, BufferPoolConfigBuilder, CaptureConfig, CaptureOrientation, EncodedRecord,
    EventKind, ImageOrientation, Result, TransferRecord,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    println!("Daguerre Buffer Pool Example");
    println!("============================");

    let config = BufferPoolConfigBuilder::new()
        .max_buffers(4)
        .max_age(Duration::from_millis(200))
        .manual_maintenance()
        .build()?;
    let pool = BufferPool::new(config)?;

    // A 320x240 BGRA preview frame lands in the 512 KiB bucket
    let width = 320u32;
    let height = 240u32;
    let stride = width * 4;
    let frame = vec![0x7fu8; (stride * height) as usize];

    println!("\nStaging a {}x{} frame ({} bytes)...", width, height, frame.len());
    let lease = pool.acquire(frame.len())?;
    pool.write(lease.address, 0, &frame)?;
    println!("  Address: {}", lease.address);
    println!("  Capacity: {} bytes ({:?})", lease.capacity, lease.origin);

    let record = TransferRecord::preview(
        lease.address,
        width,
        height,
        stride,
        frame.len(),
        CaptureOrientation::Portrait,
        ImageOrientation::for_capture(CaptureOrientation::Portrait, false),
        false,
    );
    let wire = record.encode().to_wire_string();
    println!("\nWire form: {}", wire);

    // The receiving side parses, validates, copies and releases
    let decoded = TransferRecord::decode(&EncodedRecord::parse(EventKind::Preview, &wire)?)?;
    daguerre::transfer::validate_record(&decoded, &CaptureConfig::default())?;
    let copy = pool.read(decoded.address, decoded.byte_len())?;
    pool.release(decoded.address)?;
    println!("Copied {} bytes, released {}", copy.len(), decoded.address);

    // Same bucket again: served from the pool
    let reused = pool.acquire(frame.len())?;
    println!("\nReacquired {} (same block: {})", reused.address, reused.address == lease.address);
    pool.release(reused.address)?;

    // Double release is detected
    if let Err(e) = pool.release(reused.address) {
        println!("Second release rejected: {}", e);
    }

    std::thread::sleep(Duration::from_millis(250));
    println!("\nEvicted after aging: {}", pool.maintain(false));

    println!("\n{}", pool.stats().summary());
    Ok(())
}
