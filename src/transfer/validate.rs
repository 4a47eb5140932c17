//! Content checks applied to decoded transfer records

use crate::{
    error::{DaguerreError, Result},
    session::{CaptureConfig, PixelFormat},
};

use super::record::{EventKind, TransferRecord};

/// Bytes per pixel of a raw BGRA32 image
pub const BGRA32_BYTES_PER_PIXEL: i64 = 4;

/// Check that a structurally valid record describes a usable buffer.
///
/// Bad values are `Validation` errors; a preview whose length disagrees with
/// `height * bytesPerRow` is treated as a corrupt or truncated transfer and
/// reported as a `Protocol` error.
pub fn validate_record(record: &TransferRecord, capture: &CaptureConfig) -> Result<()> {
    if record.address.is_null() {
        return Err(DaguerreError::validation("address", "null buffer address"));
    }
    if record.width <= 0 {
        return Err(DaguerreError::validation(
            "width",
            format!("must be positive, got {}", record.width),
        ));
    }
    if record.height <= 0 {
        return Err(DaguerreError::validation(
            "height",
            format!("must be positive, got {}", record.height),
        ));
    }
    if record.length <= 0 {
        return Err(DaguerreError::validation(
            "length",
            format!("must be positive, got {}", record.length),
        ));
    }

    match record.kind {
        EventKind::Preview => {
            let stride = record.bytes_per_row.unwrap_or(0);
            if stride <= 0 {
                return Err(DaguerreError::validation(
                    "bytes_per_row",
                    format!("must be positive, got {}", stride),
                ));
            }
            let expected = record.height.checked_mul(stride);
            if expected != Some(record.length) {
                return Err(DaguerreError::protocol(format!(
                    "preview length {} does not match height {} x stride {}",
                    record.length, record.height, stride
                )));
            }
        }
        EventKind::Photo => {
            if capture.photo_format == PixelFormat::Bgra32 {
                let expected = record
                    .width
                    .checked_mul(record.height)
                    .and_then(|pixels| pixels.checked_mul(BGRA32_BYTES_PER_PIXEL));
                if expected != Some(record.length) {
                    return Err(DaguerreError::validation(
                        "length",
                        format!(
                            "raw BGRA photo of {}x{} needs {} bytes, got {}",
                            record.width,
                            record.height,
                            record.width.saturating_mul(record.height).saturating_mul(4),
                            record.length
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Reject photo payloads that carry no image: empty or entirely zero
pub fn validate_photo_payload(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(DaguerreError::validation("payload", "photo payload is empty"));
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err(DaguerreError::validation(
            "payload",
            "photo payload is all zero bytes",
        ));
    }
    Ok(())
}
