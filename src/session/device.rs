//! Seam to the platform camera driver

use crate::error::Result;

use super::config::{FlashMode, SessionConfig};

/// Platform camera driver driven by a [`NativeCaptureSession`](super::NativeCaptureSession).
///
/// Implementations own the device session; frames and photos come back to
/// the session through its `deliver_*` callbacks, on whatever thread the
/// platform uses.
pub trait CaptureDevice: Send {
    /// Apply position, preset and white-balance settings
    fn configure(&mut self, config: &SessionConfig) -> Result<()>;

    /// Start streaming preview frames
    fn start(&mut self) -> Result<()>;

    /// Stop streaming; must be idempotent
    fn stop(&mut self);

    /// Ask for one still image, delivered later through `deliver_photo`
    fn trigger_photo(&mut self, flash: FlashMode) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        "capture-device"
    }
}

/// A still image produced by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One raw frame, borrowed from the device for the duration of the callback
#[derive(Debug, Clone, Copy)]
pub struct PreviewFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl PreviewFrame<'_> {
    /// Bytes the frame occupies: `height * bytes_per_row`
    pub fn byte_len(&self) -> Option<usize> {
        (self.height as usize).checked_mul(self.bytes_per_row as usize)
    }
}
