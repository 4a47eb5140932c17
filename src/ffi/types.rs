//! FFI type definitions and handle types

use crate::{
    buffers::{BufferPoolConfig, BufferPoolStats},
    error::{DaguerreError, ErrorKind},
    transfer::{EventKind, TransferRecord},
};
use std::ffi::c_void;

/// Opaque handle to a buffer pool
pub type DaguerrePoolHandle = *mut c_void;

/// Error codes for C API
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaguerreErrorCode {
    Success = 0,
    InvalidParameter = 1,
    OutOfMemory = 2,
    ProtocolError = 3,
    ValidationError = 4,
    ResourceExhausted = 5,
    StateConflict = 6,
    CustodyViolation = 7,
    SessionClosed = 8,
    DeviceError = 9,
    ConfigError = 10,
    DispatchError = 11,
    UnknownError = 99,
}

impl From<ErrorKind> for DaguerreErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidParameter => DaguerreErrorCode::InvalidParameter,
            ErrorKind::Memory => DaguerreErrorCode::OutOfMemory,
            ErrorKind::Protocol => DaguerreErrorCode::ProtocolError,
            ErrorKind::Validation => DaguerreErrorCode::ValidationError,
            ErrorKind::ResourceExhaustion => DaguerreErrorCode::ResourceExhausted,
            ErrorKind::StateConflict => DaguerreErrorCode::StateConflict,
            ErrorKind::Custody => DaguerreErrorCode::CustodyViolation,
            ErrorKind::SessionClosed => DaguerreErrorCode::SessionClosed,
            ErrorKind::Device => DaguerreErrorCode::DeviceError,
            ErrorKind::Config => DaguerreErrorCode::ConfigError,
            ErrorKind::Dispatch => DaguerreErrorCode::DispatchError,
        }
    }
}

impl From<DaguerreError> for DaguerreErrorCode {
    fn from(error: DaguerreError) -> Self {
        error.kind().into()
    }
}

/// Buffer pool configuration (C-compatible)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DaguerrePoolConfig {
    pub max_buffers: usize,
    pub max_age_ms: u64,
    pub min_poolable: usize,
    pub max_poolable: usize,
    pub alignment: usize,
    pub background_maintenance: bool,
}

impl From<&BufferPoolConfig> for DaguerrePoolConfig {
    fn from(config: &BufferPoolConfig) -> Self {
        Self {
            max_buffers: config.max_buffers,
            max_age_ms: config.max_age.as_millis() as u64,
            min_poolable: config.min_poolable,
            max_poolable: config.max_poolable,
            alignment: config.alignment,
            background_maintenance: config.background_maintenance,
        }
    }
}

impl From<&DaguerrePoolConfig> for BufferPoolConfig {
    fn from(config: &DaguerrePoolConfig) -> Self {
        BufferPoolConfig::new()
            .with_max_buffers(config.max_buffers)
            .with_max_age(std::time::Duration::from_millis(config.max_age_ms))
            .with_poolable_range(config.min_poolable, config.max_poolable)
            .with_alignment(config.alignment)
            .with_background_maintenance(config.background_maintenance)
    }
}

/// A lent buffer; the native layer fills `capacity` bytes at `address`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DaguerreBufferLease {
    pub address: usize,
    pub capacity: usize,
    pub pooled: bool,
}

/// Buffer pool statistics (C-compatible)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DaguerrePoolStats {
    pub pooled_buffers: usize,
    pub peak_buffers: usize,
    pub hits: u64,
    pub misses: u64,
    pub direct_allocations: u64,
    pub releases: u64,
    pub evictions: u64,
    pub allocation_failures: u64,
    pub hit_rate: f64,
}

impl From<BufferPoolStats> for DaguerrePoolStats {
    fn from(stats: BufferPoolStats) -> Self {
        Self {
            pooled_buffers: stats.pooled_buffers,
            peak_buffers: stats.peak_buffers,
            hits: stats.hits,
            misses: stats.misses,
            direct_allocations: stats.direct_allocations,
            releases: stats.releases,
            evictions: stats.evictions,
            allocation_failures: stats.allocation_failures,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Decoded transfer record (C-compatible). `kind` is 0 for photo, 1 for
/// preview; `bytes_per_row` is 0 on photos.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DaguerreTransferRecord {
    pub kind: u32,
    pub address: usize,
    pub width: i64,
    pub height: i64,
    pub bytes_per_row: i64,
    pub length: i64,
    pub capture_orientation: i32,
    pub image_orientation: i32,
    pub mirrored: bool,
}

impl From<&TransferRecord> for DaguerreTransferRecord {
    fn from(record: &TransferRecord) -> Self {
        Self {
            kind: match record.kind {
                EventKind::Photo => 0,
                EventKind::Preview => 1,
            },
            address: record.address.as_usize(),
            width: record.width,
            height: record.height,
            bytes_per_row: record.bytes_per_row.unwrap_or(0),
            length: record.length,
            capture_orientation: record.capture_orientation.code() as i32,
            image_orientation: record.image_orientation.code() as i32,
            mirrored: record.mirrored,
        }
    }
}
