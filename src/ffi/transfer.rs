//! FFI functions for transfer records
//!
//! Lets a native capture layer check the records it is about to post
//! against the same rules the managed side applies.

use std::ffi::c_char;

use crate::{
    error::Result,
    session::CaptureConfig,
    transfer::{validate_record, EncodedRecord, EventKind, TransferRecord},
};

use super::{
    types::*,
    utils::{c_str_to_string, string_to_c_str},
};

fn decode_wire(kind: EventKind, wire: *const c_char) -> Result<TransferRecord> {
    let wire = c_str_to_string(wire).unwrap_or_default();
    let encoded = EncodedRecord::parse(kind, &wire)?;
    let record = TransferRecord::decode(&encoded)?;
    validate_record(&record, &CaptureConfig::default())?;
    Ok(record)
}

fn decode_into(kind: EventKind, wire: *const c_char, out: *mut DaguerreTransferRecord) -> DaguerreErrorCode {
    if wire.is_null() || out.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }
    match decode_wire(kind, wire) {
        Ok(record) => {
            unsafe {
                *out = DaguerreTransferRecord::from(&record);
            }
            DaguerreErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

/// Decode and validate a photo record
/// (`address,width,height,length,orientation,imageOrientation,mirrored`)
#[no_mangle]
pub extern "C" fn daguerre_decode_photo_record(
    wire: *const c_char,
    record: *mut DaguerreTransferRecord,
) -> DaguerreErrorCode {
    decode_into(EventKind::Photo, wire, record)
}

/// Decode and validate a preview record
/// (`address,width,height,bytesPerRow,length,orientation,imageOrientation,mirrored`)
#[no_mangle]
pub extern "C" fn daguerre_decode_preview_record(
    wire: *const c_char,
    record: *mut DaguerreTransferRecord,
) -> DaguerreErrorCode {
    decode_into(EventKind::Preview, wire, record)
}

/// Render a record in its textual form (caller must free with
/// daguerre_free_string). Returns null on an invalid record.
#[no_mangle]
pub extern "C" fn daguerre_encode_record(record: *const DaguerreTransferRecord) -> *mut c_char {
    if record.is_null() {
        return std::ptr::null_mut();
    }
    let raw = unsafe { &*record };
    match to_transfer_record(raw) {
        Some(record) => string_to_c_str(record.encode().to_wire_string()),
        None => std::ptr::null_mut(),
    }
}

fn to_transfer_record(raw: &DaguerreTransferRecord) -> Option<TransferRecord> {
    use crate::{
        buffers::BufferAddress,
        transfer::{CaptureOrientation, ImageOrientation},
    };

    let kind = match raw.kind {
        0 => EventKind::Photo,
        1 => EventKind::Preview,
        _ => return None,
    };
    Some(TransferRecord {
        kind,
        address: BufferAddress::from_raw(raw.address),
        width: raw.width,
        height: raw.height,
        bytes_per_row: (kind == EventKind::Preview).then_some(raw.bytes_per_row),
        length: raw.length,
        capture_orientation: CaptureOrientation::from_code(raw.capture_orientation as i64)?,
        image_orientation: ImageOrientation::from_code(raw.image_orientation as i64)?,
        mirrored: raw.mirrored,
    })
}
