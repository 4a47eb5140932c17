//! Pooled buffer records and the addresses handed across the native boundary

use std::{fmt, ptr::NonNull, time::Instant};

/// Opaque native address of a capture buffer.
///
/// Addresses are the keys of the pool's and the custody ledger's tables; they
/// are never dereferenced outside of [`BufferPool`](super::BufferPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferAddress(usize);

impl BufferAddress {
    /// The null address
    pub const NULL: BufferAddress = BufferAddress(0);

    /// Wrap a raw address value
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw address value
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Raw address value as transmitted on the wire
    pub fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Whether this is the null address
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn from_ptr(ptr: NonNull<u8>) -> Self {
        Self(ptr.as_ptr() as usize)
    }
}

impl fmt::Display for BufferAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Where a lent buffer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOrigin {
    /// Registered in a size bucket and reused after release
    Pooled,
    /// Allocated outside the pool and freed on release
    Direct,
}

/// A buffer lent out by [`BufferPool::acquire`](super::BufferPool::acquire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLease {
    /// Native address of the block
    pub address: BufferAddress,
    /// Usable bytes at `address`; always at least the requested size
    pub capacity: usize,
    /// Pooled or direct allocation
    pub origin: LeaseOrigin,
}

impl BufferLease {
    /// Whether the block belongs to a pool bucket
    pub fn is_pooled(&self) -> bool {
        self.origin == LeaseOrigin::Pooled
    }
}

/// A block owned by the pool, lent out while `in_use` is set
#[derive(Debug)]
pub(crate) struct PooledBuffer {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) capacity: usize,
    pub(crate) last_used: Instant,
    pub(crate) in_use: bool,
}

impl PooledBuffer {
    pub(crate) fn new_lent(ptr: NonNull<u8>, capacity: usize) -> Self {
        Self {
            ptr,
            capacity,
            last_used: Instant::now(),
            in_use: true,
        }
    }

    pub(crate) fn address(&self) -> BufferAddress {
        BufferAddress::from_ptr(self.ptr)
    }

    pub(crate) fn lend(&mut self) {
        self.in_use = true;
        self.last_used = Instant::now();
    }

    pub(crate) fn give_back(&mut self) {
        self.in_use = false;
        self.last_used = Instant::now();
    }

    /// Idle and either forced out or older than `max_age`
    pub(crate) fn is_evictable(&self, aggressive: bool, now: Instant, max_age: std::time::Duration) -> bool {
        !self.in_use && (aggressive || now.saturating_duration_since(self.last_used) >= max_age)
    }
}

// The pointer is only dereferenced under the pool's lock.
unsafe impl Send for PooledBuffer {}
unsafe impl Sync for PooledBuffer {}
