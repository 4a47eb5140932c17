//! Decoded transfer records and the orientation codes they carry

use crate::buffers::BufferAddress;

/// The two kinds of native capture event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Photo,
    Preview,
}

impl EventKind {
    /// Number of fields in an encoded record of this kind
    pub const fn field_count(self) -> usize {
        match self {
            EventKind::Photo => 7,
            EventKind::Preview => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Photo => "photo",
            EventKind::Preview => "preview",
        }
    }
}

/// Orientation of the capture connection, as reported by the camera stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl CaptureOrientation {
    pub const ALL: [CaptureOrientation; 4] = [
        CaptureOrientation::Portrait,
        CaptureOrientation::PortraitUpsideDown,
        CaptureOrientation::LandscapeRight,
        CaptureOrientation::LandscapeLeft,
    ];

    pub const fn code(self) -> i64 {
        match self {
            CaptureOrientation::Portrait => 1,
            CaptureOrientation::PortraitUpsideDown => 2,
            CaptureOrientation::LandscapeRight => 3,
            CaptureOrientation::LandscapeLeft => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(CaptureOrientation::Portrait),
            2 => Some(CaptureOrientation::PortraitUpsideDown),
            3 => Some(CaptureOrientation::LandscapeRight),
            4 => Some(CaptureOrientation::LandscapeLeft),
            _ => None,
        }
    }
}

/// Orientation tag of the produced image, including mirrored variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageOrientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

impl ImageOrientation {
    pub const fn code(self) -> i64 {
        match self {
            ImageOrientation::Up => 0,
            ImageOrientation::Down => 1,
            ImageOrientation::Left => 2,
            ImageOrientation::Right => 3,
            ImageOrientation::UpMirrored => 4,
            ImageOrientation::DownMirrored => 5,
            ImageOrientation::LeftMirrored => 6,
            ImageOrientation::RightMirrored => 7,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ImageOrientation::Up),
            1 => Some(ImageOrientation::Down),
            2 => Some(ImageOrientation::Left),
            3 => Some(ImageOrientation::Right),
            4 => Some(ImageOrientation::UpMirrored),
            5 => Some(ImageOrientation::DownMirrored),
            6 => Some(ImageOrientation::LeftMirrored),
            7 => Some(ImageOrientation::RightMirrored),
            _ => None,
        }
    }

    pub const fn is_mirrored(self) -> bool {
        matches!(
            self,
            ImageOrientation::UpMirrored
                | ImageOrientation::DownMirrored
                | ImageOrientation::LeftMirrored
                | ImageOrientation::RightMirrored
        )
    }

    /// Image orientation produced by a capture orientation on the back
    /// (`mirrored = false`) or front (`mirrored = true`) camera
    pub fn for_capture(capture: CaptureOrientation, mirrored: bool) -> Self {
        match (capture, mirrored) {
            (CaptureOrientation::Portrait, false) => ImageOrientation::Right,
            (CaptureOrientation::Portrait, true) => ImageOrientation::LeftMirrored,
            (CaptureOrientation::PortraitUpsideDown, false) => ImageOrientation::Left,
            (CaptureOrientation::PortraitUpsideDown, true) => ImageOrientation::RightMirrored,
            (CaptureOrientation::LandscapeRight, false) => ImageOrientation::Up,
            (CaptureOrientation::LandscapeRight, true) => ImageOrientation::DownMirrored,
            (CaptureOrientation::LandscapeLeft, false) => ImageOrientation::Down,
            (CaptureOrientation::LandscapeLeft, true) => ImageOrientation::UpMirrored,
        }
    }
}

/// One native buffer described for the managed side.
///
/// Dimensions are carried signed, as on the wire, so that validation can tell
/// a non-positive dimension apart from a malformed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub kind: EventKind,
    pub address: BufferAddress,
    pub width: i64,
    pub height: i64,
    /// Row stride; present on preview records only
    pub bytes_per_row: Option<i64>,
    pub length: i64,
    pub capture_orientation: CaptureOrientation,
    pub image_orientation: ImageOrientation,
    pub mirrored: bool,
}

impl TransferRecord {
    /// Describe an encoded still image
    pub fn photo(
        address: BufferAddress,
        width: u32,
        height: u32,
        length: usize,
        capture_orientation: CaptureOrientation,
        image_orientation: ImageOrientation,
        mirrored: bool,
    ) -> Self {
        Self {
            kind: EventKind::Photo,
            address,
            width: width as i64,
            height: height as i64,
            bytes_per_row: None,
            length: length as i64,
            capture_orientation,
            image_orientation,
            mirrored,
        }
    }

    /// Describe a raw preview frame
    #[allow(clippy::too_many_arguments)]
    pub fn preview(
        address: BufferAddress,
        width: u32,
        height: u32,
        bytes_per_row: u32,
        length: usize,
        capture_orientation: CaptureOrientation,
        image_orientation: ImageOrientation,
        mirrored: bool,
    ) -> Self {
        Self {
            kind: EventKind::Preview,
            address,
            width: width as i64,
            height: height as i64,
            bytes_per_row: Some(bytes_per_row as i64),
            length: length as i64,
            capture_orientation,
            image_orientation,
            mirrored,
        }
    }

    /// Payload length in bytes; zero for a negative wire value
    pub fn byte_len(&self) -> usize {
        usize::try_from(self.length).unwrap_or(0)
    }
}
