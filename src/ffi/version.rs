//! Version queries for native capture layers

use std::ffi::c_char;

use super::utils::string_to_c_str;
use crate::transfer::EventKind;

#[no_mangle]
pub extern "C" fn daguerre_version_major() -> u32 {
    crate::VERSION_MAJOR
}

#[no_mangle]
pub extern "C" fn daguerre_version_minor() -> u32 {
    crate::VERSION_MINOR
}

#[no_mangle]
pub extern "C" fn daguerre_version_patch() -> u32 {
    crate::VERSION_PATCH
}

/// Library version as "major.minor.patch"; free with `daguerre_free_string`
#[no_mangle]
pub extern "C" fn daguerre_version_string() -> *mut c_char {
    string_to_c_str(crate::VERSION.to_string())
}

/// Whether a capture layer built against `major.minor` can talk to this
/// library. Majors must match; the library minor must be at least the
/// caller's.
#[no_mangle]
pub extern "C" fn daguerre_version_compatible(major: u32, minor: u32) -> bool {
    major == crate::VERSION_MAJOR && minor <= crate::VERSION_MINOR
}

/// Number of wire fields in a record of `kind` (0 photo, 1 preview), or 0
/// for an unknown kind
#[no_mangle]
pub extern "C" fn daguerre_record_field_count(kind: u32) -> u32 {
    match kind {
        0 => EventKind::Photo.field_count() as u32,
        1 => EventKind::Preview.field_count() as u32,
        _ => 0,
    }
}
