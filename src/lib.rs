//! # Daguerre - Native Camera Capture Pipeline
//!
//! Daguerre moves camera frames and photos from a native capture layer to a
//! managed application layer without leaking, double-freeing or racing on
//! the natively allocated pixel buffers that carry them.
//!
//! ## Features
//!
//! - **Buffer pool**: Size-bucketed reuse of native blocks with aging and eviction
//! - **Transfer protocol**: Flat field-list records with fail-closed decoding
//! - **Custody tracking**: Double release and use after release are detected, not undefined
//! - **Single-flight capture**: At most one photo in flight, previews never race it
//! - **Owner-thread dispatch**: Textures are only mutated by one designated thread
//! - **C API**: Pool and record codec for platform capture layers
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐   NativeEvent    ┌───────────────────────────┐
//! │   NativeCaptureSession   │ ───────────────▶ │    CaptureStateMachine    │
//! │  - throttle, pause       │ (bounded channel)│  - decode, copy, release  │
//! │  - stage into buffers    │                  │  - single-flight guard    │
//! │  - custody ledger        │ ◀─────────────── │  - orientation transform  │
//! └──────────────────────────┘   release(addr)  └───────────────────────────┘
//!           │                                                │
//!           ▼                                                ▼
//! ┌──────────────────────────┐                  ┌───────────────────────────┐
//! │        BufferPool        │                  │   MainThreadDispatcher    │
//! │  (power-of-two buckets)  │                  │   (texture replacement)   │
//! └──────────────────────────┘                  └───────────────────────────┘
//! ```

// Core modules
pub mod allocators;
pub mod buffers;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod transfer;

#[cfg(feature = "c-api")]
pub mod ffi;

// Main API re-exports
pub use allocators::{BlockAllocator, BlockAllocatorExt, HeapAllocator};
pub use buffers::{
    AtomicBufferPoolStats, BufferAddress, BufferLease, BufferPool, BufferPoolConfig,
    BufferPoolConfigBuilder, BufferPoolStats, LeaseOrigin, MaintenanceHandle,
};
pub use config::PipelineConfig;
pub use error::{DaguerreError, ErrorKind, Result};
pub use pipeline::{
    derive_transform, CameraBridge, CaptureEvent, CaptureGuard, CaptureState,
    CaptureStateMachine, DeviceOrientation, InMemoryTextureStore, MainThreadDispatcher,
    OrientationTransform, PipelineRunner, PipelineStats, TextureHandle, TextureStore,
};
pub use session::{
    CameraPosition, CaptureConfig, CaptureDevice, CapturedPhoto, FlashMode, LifecycleEvent,
    NativeCaptureSession, NativeEvent, PixelFormat, PreviewFrame, PreviewOutcome,
    SessionConfig, SessionStats, SyntheticCamera, WhiteBalanceMode,
};
pub use transfer::{
    CaptureOrientation, CustodyLedger, EncodedRecord, EventKind, ImageOrientation,
    TransferRecord, WireField,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 2;
pub const VERSION_PATCH: u32 = 0;
