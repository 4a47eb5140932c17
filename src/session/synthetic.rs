//! Software camera for tests, demos and the simulator

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DaguerreError, Result};

use super::{
    config::{FlashMode, SessionConfig},
    device::{CaptureDevice, CapturedPhoto, PreviewFrame},
};

#[derive(Debug, Default)]
struct SyntheticState {
    running: bool,
    configure_calls: usize,
    photo_requests: usize,
    last_config: Option<SessionConfig>,
    last_flash: Option<FlashMode>,
    fail_configure: bool,
    fail_trigger: bool,
    frame_counter: u64,
}

/// A camera that renders gradient frames on demand.
///
/// Clones share state: hand one to the session as its device and keep
/// another to render frames and inspect what the session asked for.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    state: Arc<Mutex<SyntheticState>>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxed clone for [`NativeCaptureSession::new`](super::NativeCaptureSession::new)
    pub fn device(&self) -> Box<dyn CaptureDevice> {
        Box::new(self.clone())
    }

    /// Render the next BGRA frame with `stride` bytes per row
    pub fn render_preview(&self, width: u32, height: u32, stride: u32) -> Vec<u8> {
        let frame = {
            let mut state = self.state.lock();
            state.frame_counter += 1;
            state.frame_counter
        };
        let mut data = vec![0u8; height as usize * stride as usize];
        if stride == 0 {
            return data;
        }
        for (row_index, row) in data.chunks_mut(stride as usize).enumerate() {
            for (column, pixel) in row.chunks_exact_mut(4).take(width as usize).enumerate() {
                pixel.copy_from_slice(&[
                    (column as u64 + frame) as u8,
                    row_index as u8,
                    frame as u8,
                    0xff,
                ]);
            }
        }
        data
    }

    /// Render a still image payload of `len` bytes; never all zero
    pub fn render_photo(&self, width: u32, height: u32, len: usize) -> CapturedPhoto {
        let seed = self.state.lock().photo_requests as u8;
        let data = (0..len).map(|i| (i as u8).wrapping_add(seed) | 1).collect();
        CapturedPhoto { data, width, height }
    }

    /// Borrow `data` as a preview frame
    pub fn frame<'a>(data: &'a [u8], width: u32, height: u32, stride: u32) -> PreviewFrame<'a> {
        PreviewFrame {
            data,
            width,
            height,
            bytes_per_row: stride,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn configure_calls(&self) -> usize {
        self.state.lock().configure_calls
    }

    pub fn photo_requests(&self) -> usize {
        self.state.lock().photo_requests
    }

    pub fn last_config(&self) -> Option<SessionConfig> {
        self.state.lock().last_config.clone()
    }

    pub fn last_flash(&self) -> Option<FlashMode> {
        self.state.lock().last_flash
    }

    /// Make subsequent `configure` calls fail
    pub fn fail_configure(&self, fail: bool) {
        self.state.lock().fail_configure = fail;
    }

    /// Make subsequent photo triggers fail
    pub fn fail_trigger(&self, fail: bool) {
        self.state.lock().fail_trigger = fail;
    }
}

impl CaptureDevice for SyntheticCamera {
    fn configure(&mut self, config: &SessionConfig) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_configure {
            return Err(DaguerreError::device("synthetic camera refused configuration"));
        }
        state.configure_calls += 1;
        state.last_config = Some(config.clone());
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.state.lock().running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().running = false;
    }

    fn trigger_photo(&mut self, flash: FlashMode) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_trigger {
            return Err(DaguerreError::device("synthetic camera has no photo output"));
        }
        state.photo_requests += 1;
        state.last_flash = Some(flash);
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
