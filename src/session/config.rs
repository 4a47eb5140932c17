//! Capture session and payload format configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::{
        duration_ms, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_NOTICE_TIMEOUT, DEFAULT_PREVIEW_INTERVAL,
        MAX_COLOR_TEMPERATURE, MIN_COLOR_TEMPERATURE,
    },
    error::{DaguerreError, Result},
};

/// Which physical camera feeds the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
}

impl CameraPosition {
    pub fn toggled(self) -> Self {
        match self {
            CameraPosition::Back => CameraPosition::Front,
            CameraPosition::Front => CameraPosition::Back,
        }
    }

    /// Front cameras produce mirrored output
    pub fn is_mirrored(self) -> bool {
        self == CameraPosition::Front
    }
}

/// Capture quality preset requested from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    #[default]
    Photo,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalanceMode {
    Locked,
    AutoWhiteBalance,
    #[default]
    ContinuousAutoWhiteBalance,
}

impl WhiteBalanceMode {
    /// Map the integer mode used by native camera APIs
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(WhiteBalanceMode::Locked),
            1 => Some(WhiteBalanceMode::AutoWhiteBalance),
            2 => Some(WhiteBalanceMode::ContinuousAutoWhiteBalance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

/// Byte layout of a transferred image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Compressed still image (JPEG/HEIC); length is arbitrary
    Encoded,
    /// Raw 32-bit BGRA, 4 bytes per pixel
    Bgra32,
}

/// Formats of the two payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub photo_format: PixelFormat,
    pub preview_format: PixelFormat,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            photo_format: PixelFormat::Encoded,
            preview_format: PixelFormat::Bgra32,
        }
    }
}

/// Configuration for a [`NativeCaptureSession`](super::NativeCaptureSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum spacing between accepted preview frames
    #[serde(with = "duration_ms", rename = "preview_interval_ms")]
    pub preview_interval: Duration,
    /// Capacity of the bounded native event channel
    pub event_channel_capacity: usize,
    /// How long a lifecycle notice waits for room before it is dropped
    #[serde(with = "duration_ms", rename = "notice_timeout_ms")]
    pub notice_timeout: Duration,
    pub camera_position: CameraPosition,
    pub preset: SessionPreset,
    pub white_balance: WhiteBalanceMode,
    /// Locked white-balance temperature in Kelvin
    pub color_temperature: Option<f32>,
    pub flash: FlashMode,
    /// Restart the preview throttle when the camera is switched
    pub reset_throttle_on_switch: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_interval: DEFAULT_PREVIEW_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            notice_timeout: DEFAULT_NOTICE_TIMEOUT,
            camera_position: CameraPosition::Back,
            preset: SessionPreset::Photo,
            white_balance: WhiteBalanceMode::ContinuousAutoWhiteBalance,
            color_temperature: None,
            flash: FlashMode::Off,
            reset_throttle_on_switch: false,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview_interval(mut self, interval: Duration) -> Self {
        self.preview_interval = interval;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn with_notice_timeout(mut self, timeout: Duration) -> Self {
        self.notice_timeout = timeout;
        self
    }

    pub fn with_camera_position(mut self, position: CameraPosition) -> Self {
        self.camera_position = position;
        self
    }

    pub fn with_reset_throttle_on_switch(mut self, reset: bool) -> Self {
        self.reset_throttle_on_switch = reset;
        self
    }

    /// Clamp a colour temperature into the supported range
    pub fn clamp_temperature(kelvin: f32) -> f32 {
        kelvin.clamp(MIN_COLOR_TEMPERATURE, MAX_COLOR_TEMPERATURE)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(DaguerreError::invalid_parameter(
                "event_channel_capacity",
                "Event channel needs room for at least one event",
            ));
        }
        if let Some(kelvin) = self.color_temperature {
            if !kelvin.is_finite() {
                return Err(DaguerreError::invalid_parameter(
                    "color_temperature",
                    "Colour temperature must be a finite number",
                ));
            }
        }
        Ok(())
    }
}
