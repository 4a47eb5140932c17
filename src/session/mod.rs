//! Native capture session
//!
//! Device configuration, preview throttling, and staging of photos and
//! frames into pooled buffers that are published to the managed side.

pub mod capture;
pub mod config;
pub mod device;
pub mod stats;
pub mod synthetic;
pub mod throttle;

pub use capture::{LifecycleEvent, NativeCaptureSession, NativeEvent, PreviewOutcome};
pub use config::{
    CameraPosition, CaptureConfig, FlashMode, PixelFormat, SessionConfig, SessionPreset,
    WhiteBalanceMode,
};
pub use device::{CaptureDevice, CapturedPhoto, PreviewFrame};
pub use stats::{AtomicSessionStats, SessionStats};
pub use synthetic::SyntheticCamera;
pub use throttle::FrameThrottle;
