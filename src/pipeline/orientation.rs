//! Rotation and mirroring of transferred images
//!
//! Pure functions mapping the orientation codes on a record, plus the latest
//! device orientation reading, to the rotation and per-axis scale a consumer
//! applies when displaying the texture.

use crate::transfer::{CaptureOrientation, EventKind, ImageOrientation};

/// Physical orientation of the device as reported by its motion sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    pub const ALL: [DeviceOrientation; 7] = [
        DeviceOrientation::Unknown,
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
    ];

    pub const fn code(self) -> i64 {
        match self {
            DeviceOrientation::Unknown => 0,
            DeviceOrientation::Portrait => 1,
            DeviceOrientation::PortraitUpsideDown => 2,
            DeviceOrientation::LandscapeLeft => 3,
            DeviceOrientation::LandscapeRight => 4,
            DeviceOrientation::FaceUp => 5,
            DeviceOrientation::FaceDown => 6,
        }
    }

    /// Unrecognised codes read as `Unknown`
    pub fn from_code(code: i64) -> Self {
        Self::ALL
            .into_iter()
            .find(|o| o.code() == code)
            .unwrap_or(DeviceOrientation::Unknown)
    }

    /// Capture orientation that keeps the image upright for this device
    /// orientation. The landscape sides swap because device and capture
    /// orientations name them from opposite ends of the home button.
    pub fn to_capture_orientation(self) -> CaptureOrientation {
        match self {
            DeviceOrientation::PortraitUpsideDown => CaptureOrientation::PortraitUpsideDown,
            DeviceOrientation::LandscapeLeft => CaptureOrientation::LandscapeRight,
            DeviceOrientation::LandscapeRight => CaptureOrientation::LandscapeLeft,
            _ => CaptureOrientation::Portrait,
        }
    }
}

/// Display transform for one texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationTransform {
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    /// Per-axis scale; negative components flip that axis
    pub scale: [f32; 3],
    pub mirrored: bool,
}

impl OrientationTransform {
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation as f32
    }

    /// Whether the rotation swaps the displayed width and height
    pub fn is_perpendicular(&self) -> bool {
        self.rotation % 180 == 90
    }
}

/// Derive the display transform of a record.
///
/// Photos take their angle from the image orientation tag, and the mirrored
/// variants of that tag decide the flip so a front-camera still is not
/// flipped twice. Previews look the angle up by device and capture
/// orientation; pairs not in the table rotate by 0.
pub fn derive_transform(
    kind: EventKind,
    capture: CaptureOrientation,
    image: ImageOrientation,
    device: DeviceOrientation,
    mirrored: bool,
) -> OrientationTransform {
    let (rotation, mirrored) = match kind {
        EventKind::Photo => (photo_rotation(image), image.is_mirrored()),
        EventKind::Preview => (preview_rotation(device, capture), mirrored),
    };
    OrientationTransform {
        rotation,
        scale: scale_for(rotation, mirrored),
        mirrored,
    }
}

fn photo_rotation(image: ImageOrientation) -> u16 {
    match image {
        ImageOrientation::Up | ImageOrientation::UpMirrored => 0,
        ImageOrientation::Right | ImageOrientation::RightMirrored => 90,
        ImageOrientation::Down | ImageOrientation::DownMirrored => 180,
        ImageOrientation::Left | ImageOrientation::LeftMirrored => 270,
    }
}

fn preview_rotation(device: DeviceOrientation, capture: CaptureOrientation) -> u16 {
    use CaptureOrientation as C;
    use DeviceOrientation as D;

    match (device, capture) {
        (D::Portrait, C::Portrait | C::PortraitUpsideDown) => 90,
        (D::Portrait, C::LandscapeRight | C::LandscapeLeft) => 270,
        (D::LandscapeLeft, C::Portrait | C::PortraitUpsideDown) => 180,
        (D::LandscapeLeft, C::LandscapeRight | C::LandscapeLeft) => 0,
        (D::PortraitUpsideDown, C::Portrait | C::PortraitUpsideDown) => 270,
        (D::PortraitUpsideDown, C::LandscapeRight | C::LandscapeLeft) => 90,
        (D::LandscapeRight, C::Portrait | C::PortraitUpsideDown) => 0,
        (D::LandscapeRight, C::LandscapeRight | C::LandscapeLeft) => 180,
        _ => 0,
    }
}

// Native rows arrive top-down, so an unmirrored image needs one flip along
// its vertical axis; which screen axis that is depends on the rotation.
fn scale_for(rotation: u16, mirrored: bool) -> [f32; 3] {
    match (mirrored, rotation % 180 == 90) {
        (true, _) => [-1.0, -1.0, 1.0],
        (false, true) => [-1.0, 1.0, 1.0],
        (false, false) => [1.0, -1.0, 1.0],
    }
}
