//! FFI functions for the capture buffer pool

use std::sync::Arc;

use tracing::warn;

use crate::buffers::{BufferAddress, BufferPool, BufferPoolConfig};

use super::{
    types::*,
    utils::{PoolEntry, HANDLE_REGISTRY},
};

fn lookup(pool: DaguerrePoolHandle) -> Option<Arc<BufferPool>> {
    if pool.is_null() {
        return None;
    }
    HANDLE_REGISTRY.lock().get_pool(pool as usize)
}

/// Fill `config` with the default pool configuration
#[no_mangle]
pub extern "C" fn daguerre_pool_config_default(config: *mut DaguerrePoolConfig) -> DaguerreErrorCode {
    if config.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }
    unsafe {
        *config = DaguerrePoolConfig::from(&BufferPoolConfig::default());
    }
    DaguerreErrorCode::Success
}

/// Create a buffer pool; a null `config` selects the defaults
#[no_mangle]
pub extern "C" fn daguerre_pool_create(
    config: *const DaguerrePoolConfig,
    pool_handle: *mut DaguerrePoolHandle,
) -> DaguerreErrorCode {
    if pool_handle.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }

    let rust_config = if config.is_null() {
        BufferPoolConfig::default()
    } else {
        BufferPoolConfig::from(unsafe { &*config })
    };

    let pool = match BufferPool::new(rust_config) {
        Ok(pool) => Arc::new(pool),
        Err(e) => return e.into(),
    };
    let maintenance = if pool.config().background_maintenance {
        match pool.start_maintenance() {
            Ok(handle) => Some(handle),
            Err(e) => return e.into(),
        }
    } else {
        None
    };

    let id = HANDLE_REGISTRY.lock().store_pool(PoolEntry { pool, maintenance });
    unsafe {
        *pool_handle = id as DaguerrePoolHandle;
    }
    DaguerreErrorCode::Success
}

/// Borrow a buffer of at least `size` bytes
#[no_mangle]
pub extern "C" fn daguerre_pool_acquire(
    pool: DaguerrePoolHandle,
    size: usize,
    lease: *mut DaguerreBufferLease,
) -> DaguerreErrorCode {
    if lease.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }
    let pool = match lookup(pool) {
        Some(pool) => pool,
        None => return DaguerreErrorCode::InvalidParameter,
    };

    match pool.acquire(size) {
        Ok(acquired) => {
            unsafe {
                *lease = DaguerreBufferLease {
                    address: acquired.address.as_usize(),
                    capacity: acquired.capacity,
                    pooled: acquired.is_pooled(),
                };
            }
            DaguerreErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

/// Return a buffer obtained from `daguerre_pool_acquire`
#[no_mangle]
pub extern "C" fn daguerre_pool_release(pool: DaguerrePoolHandle, address: usize) -> DaguerreErrorCode {
    let pool = match lookup(pool) {
        Some(pool) => pool,
        None => return DaguerreErrorCode::InvalidParameter,
    };
    match pool.release(BufferAddress::from_raw(address)) {
        Ok(()) => DaguerreErrorCode::Success,
        Err(e) => {
            warn!(address, error = %e, "C caller released an invalid buffer");
            e.into()
        }
    }
}

/// Evict idle buffers; `evicted` may be null
#[no_mangle]
pub extern "C" fn daguerre_pool_maintain(
    pool: DaguerrePoolHandle,
    aggressive: bool,
    evicted: *mut usize,
) -> DaguerreErrorCode {
    let pool = match lookup(pool) {
        Some(pool) => pool,
        None => return DaguerreErrorCode::InvalidParameter,
    };
    let count = pool.maintain(aggressive);
    if !evicted.is_null() {
        unsafe {
            *evicted = count;
        }
    }
    DaguerreErrorCode::Success
}

/// Get pool statistics
#[no_mangle]
pub extern "C" fn daguerre_pool_stats(
    pool: DaguerrePoolHandle,
    stats: *mut DaguerrePoolStats,
) -> DaguerreErrorCode {
    if stats.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }
    let pool = match lookup(pool) {
        Some(pool) => pool,
        None => return DaguerreErrorCode::InvalidParameter,
    };
    unsafe {
        *stats = pool.stats().into();
    }
    DaguerreErrorCode::Success
}

/// Tear the pool down, freeing every buffer including ones still lent
#[no_mangle]
pub extern "C" fn daguerre_pool_destroy(pool: DaguerrePoolHandle) -> DaguerreErrorCode {
    if pool.is_null() {
        return DaguerreErrorCode::InvalidParameter;
    }
    let entry = match HANDLE_REGISTRY.lock().remove_pool(pool as usize) {
        Some(entry) => entry,
        None => return DaguerreErrorCode::InvalidParameter,
    };
    if let Some(handle) = entry.maintenance {
        handle.stop();
    }
    entry.pool.teardown();
    DaguerreErrorCode::Success
}
