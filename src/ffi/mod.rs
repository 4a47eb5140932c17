//! C Foreign Function Interface (FFI) for native capture layers
//!
//! Exposes the buffer pool to a platform capture layer through opaque
//! handles, and the transfer-record codec for native-side self checks.

pub mod pool;
pub mod transfer;
pub mod types;
pub mod utils;
pub mod version;

// Re-export commonly used types and functions
pub use types::{
    DaguerreBufferLease, DaguerreErrorCode, DaguerrePoolConfig, DaguerrePoolHandle,
    DaguerrePoolStats, DaguerreTransferRecord,
};

pub use utils::{daguerre_free_string, HANDLE_REGISTRY};

// Buffer pool API
pub use pool::{
    daguerre_pool_acquire, daguerre_pool_config_default, daguerre_pool_create,
    daguerre_pool_destroy, daguerre_pool_maintain, daguerre_pool_release, daguerre_pool_stats,
};

// Transfer record API
pub use transfer::{
    daguerre_decode_photo_record, daguerre_decode_preview_record, daguerre_encode_record,
};

// Version API
pub use version::{
    daguerre_record_field_count, daguerre_version_compatible, daguerre_version_major,
    daguerre_version_minor, daguerre_version_patch, daguerre_version_string,
};
