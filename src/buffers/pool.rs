//! Size-bucketed pool of reusable native capture buffers

use std::{
    collections::{BTreeMap, HashMap},
    ptr::NonNull,
    sync::Arc,
    time::Instant,
};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::{
    allocators::{BlockAllocator, HeapAllocator},
    error::{DaguerreError, Result},
};

use super::{
    buffer::{BufferAddress, BufferLease, LeaseOrigin, PooledBuffer},
    config::BufferPoolConfig,
    stats::{AtomicBufferPoolStats, BufferPoolStats},
};

/// A block allocated outside the buckets, freed on release
#[derive(Debug)]
struct DirectBlock {
    ptr: NonNull<u8>,
    size: usize,
}

// Only dereferenced under the pool's lock.
unsafe impl Send for DirectBlock {}
unsafe impl Sync for DirectBlock {}

#[derive(Debug, Default)]
struct PoolState {
    /// Bucket size (power of two) -> buffers of that bucket
    buckets: BTreeMap<usize, Vec<PooledBuffer>>,
    total_buffers: usize,
    /// Outstanding direct allocations
    direct: HashMap<BufferAddress, DirectBlock>,
    torn_down: bool,
}

impl PoolState {
    fn ensure_open(&self) -> Result<()> {
        if self.torn_down {
            return Err(DaguerreError::session_closed("buffer pool has been torn down"));
        }
        Ok(())
    }

    fn find_pooled(&self, address: BufferAddress) -> Option<&PooledBuffer> {
        self.buckets
            .values()
            .flat_map(|buffers| buffers.iter())
            .find(|buffer| buffer.address() == address)
    }

    fn find_pooled_mut(&mut self, address: BufferAddress) -> Option<&mut PooledBuffer> {
        self.buckets
            .values_mut()
            .flat_map(|buffers| buffers.iter_mut())
            .find(|buffer| buffer.address() == address)
    }

    /// Pointer and capacity of a block currently lent out
    fn lent_block(&self, address: BufferAddress) -> Result<(NonNull<u8>, usize)> {
        if let Some(buffer) = self.find_pooled(address) {
            if !buffer.in_use {
                return Err(DaguerreError::custody(
                    address.as_usize(),
                    "buffer accessed after it was released to the pool",
                ));
            }
            return Ok((buffer.ptr, buffer.capacity));
        }
        if let Some(block) = self.direct.get(&address) {
            return Ok((block.ptr, block.size));
        }
        Err(DaguerreError::custody(
            address.as_usize(),
            "address is not lent out by this pool",
        ))
    }
}

/// Pool of reusable native memory blocks keyed by power-of-two size bucket.
///
/// All bucket-map mutation happens under one exclusive region; the byte
/// accessors ([`write`](Self::write), [`read`](Self::read)) share it so a
/// block is never freed while it is being copied.
#[derive(Debug)]
pub struct BufferPool {
    config: BufferPoolConfig,
    allocator: Arc<dyn BlockAllocator>,
    state: RwLock<PoolState>,
    stats: AtomicBufferPoolStats,
}

impl BufferPool {
    /// Create a pool backed by the heap
    pub fn new(config: BufferPoolConfig) -> Result<Self> {
        let allocator = HeapAllocator::new(config.alignment)?;
        Self::with_allocator(config, Arc::new(allocator))
    }

    /// Create a pool backed by a custom allocator
    pub fn with_allocator(config: BufferPoolConfig, allocator: Arc<dyn BlockAllocator>) -> Result<Self> {
        config.validate()?;
        debug!(
            max_buffers = config.max_buffers,
            min_poolable = config.min_poolable,
            max_poolable = config.max_poolable,
            max_age_ms = config.max_age.as_millis() as u64,
            allocator = allocator.type_name(),
            "Creating buffer pool"
        );
        Ok(Self {
            config,
            allocator,
            state: RwLock::new(PoolState::default()),
            stats: AtomicBufferPoolStats::new(),
        })
    }

    /// Lend out a buffer of at least `size` bytes
    pub fn acquire(&self, size: usize) -> Result<BufferLease> {
        if size == 0 {
            return Err(DaguerreError::invalid_parameter(
                "size",
                "Cannot acquire an empty buffer",
            ));
        }

        if !self.config.is_poolable(size) {
            let mut state = self.state.write();
            state.ensure_open()?;
            return self.allocate_direct(&mut state, size);
        }

        let bucket = size.next_power_of_two();
        let mut state = self.state.write();
        state.ensure_open()?;

        if let Some(lease) = self.lend_idle(&mut state, bucket, size) {
            return Ok(lease);
        }
        if state.total_buffers < self.config.max_buffers {
            return self.register_new(&mut state, bucket);
        }

        self.stats.record_pressure_pass();
        let evicted = self.evict_locked(&mut state, true);
        debug!(size, bucket, evicted, "Pool at capacity, ran aggressive eviction");

        if let Some(lease) = self.lend_idle(&mut state, bucket, size) {
            return Ok(lease);
        }
        if state.total_buffers < self.config.max_buffers {
            return self.register_new(&mut state, bucket);
        }

        warn!(
            size,
            pooled = state.total_buffers,
            "All pooled buffers in use, falling back to direct allocation"
        );
        self.allocate_direct(&mut state, size)
    }

    /// Return a lent buffer. Pooled buffers go back to their bucket, direct
    /// allocations are freed immediately.
    pub fn release(&self, address: BufferAddress) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;

        match state.find_pooled_mut(address) {
            Some(buffer) => {
                if !buffer.in_use {
                    return Err(DaguerreError::custody(
                        address.as_usize(),
                        "pooled buffer released twice",
                    ));
                }
                buffer.give_back();
                trace!(%address, "Returned buffer to pool");
            }
            None => match state.direct.remove(&address) {
                Some(block) => {
                    // SAFETY: the block came from this allocator with this size
                    // and was just removed from the table.
                    unsafe { self.allocator.deallocate(block.ptr, block.size) };
                    trace!(%address, size = block.size, "Freed direct allocation");
                }
                None => {
                    return Err(DaguerreError::custody(
                        address.as_usize(),
                        "address is not lent out by this pool",
                    ));
                }
            },
        }

        self.stats.record_release();

        if state.total_buffers > self.config.max_buffers / 2 {
            self.evict_locked(&mut state, false);
        }
        Ok(())
    }

    /// Evict idle buffers: all of them when `aggressive`, otherwise those
    /// idle for longer than `max_age`. Returns the number evicted.
    pub fn maintain(&self, aggressive: bool) -> usize {
        let mut state = self.state.write();
        if state.torn_down {
            return 0;
        }
        self.evict_locked(&mut state, aggressive)
    }

    /// Release every idle buffer, used under memory pressure
    pub fn trim(&self) -> usize {
        self.maintain(true)
    }

    /// Free every block, lent or not. Later calls fail with `SessionClosed`.
    pub fn teardown(&self) -> usize {
        let mut state = self.state.write();
        if state.torn_down {
            return 0;
        }

        let mut freed = 0;
        for (_, buffers) in std::mem::take(&mut state.buckets) {
            for buffer in buffers {
                if buffer.in_use {
                    debug!(address = %buffer.address(), "Tearing down buffer still lent out");
                }
                // SAFETY: every pooled buffer was allocated with its capacity.
                unsafe { self.allocator.deallocate(buffer.ptr, buffer.capacity) };
                freed += 1;
            }
        }
        for (_, block) in state.direct.drain() {
            // SAFETY: as above, for direct blocks.
            unsafe { self.allocator.deallocate(block.ptr, block.size) };
            freed += 1;
        }
        state.total_buffers = 0;
        state.torn_down = true;
        self.stats.set_pooled(0);

        debug!(freed, "Buffer pool torn down");
        freed
    }

    /// Copy `data` into a lent buffer at `offset`
    pub fn write(&self, address: BufferAddress, offset: usize, data: &[u8]) -> Result<()> {
        let state = self.state.read();
        state.ensure_open()?;
        let (ptr, capacity) = state.lent_block(address)?;

        let end = offset.checked_add(data.len()).unwrap_or(usize::MAX);
        if end > capacity {
            return Err(DaguerreError::invalid_parameter(
                "data",
                format!("{} bytes at offset {} overflow a {} byte buffer", data.len(), offset, capacity),
            ));
        }

        // SAFETY: bounds checked above; the read lock keeps the block alive.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset), data.len());
        }
        Ok(())
    }

    /// Copy the first `len` bytes of a lent buffer into an owned vector
    pub fn read(&self, address: BufferAddress, len: usize) -> Result<Vec<u8>> {
        let state = self.state.read();
        state.ensure_open()?;
        let (ptr, capacity) = state.lent_block(address)?;

        if len > capacity {
            return Err(DaguerreError::invalid_parameter(
                "len",
                format!("cannot read {} bytes from a {} byte buffer", len, capacity),
            ));
        }

        let mut bytes = vec![0u8; len];
        // SAFETY: bounds checked above; the read lock keeps the block alive.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), bytes.as_mut_ptr(), len);
        }
        Ok(bytes)
    }

    /// Get current statistics
    pub fn stats(&self) -> BufferPoolStats {
        self.stats.snapshot()
    }

    /// Get pool configuration
    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Number of pooled buffers across all buckets
    pub fn buffer_count(&self) -> usize {
        self.state.read().total_buffers
    }

    /// Number of pooled buffers currently lent out
    pub fn in_use_count(&self) -> usize {
        self.state
            .read()
            .buckets
            .values()
            .flat_map(|buffers| buffers.iter())
            .filter(|buffer| buffer.in_use)
            .count()
    }

    /// Number of direct allocations not yet released
    pub fn direct_count(&self) -> usize {
        self.state.read().direct.len()
    }

    /// `(bucket size, buffer count)` for every non-empty bucket, ascending
    pub fn bucket_sizes(&self) -> Vec<(usize, usize)> {
        self.state
            .read()
            .buckets
            .iter()
            .map(|(&size, buffers)| (size, buffers.len()))
            .collect()
    }

    /// Approximate emptiness check; may be stale by the time it returns
    pub fn is_empty(&self) -> bool {
        self.buffer_count() == 0
    }

    /// Whether `address` is currently lent out
    pub fn is_lent(&self, address: BufferAddress) -> bool {
        self.state.read().lent_block(address).is_ok()
    }

    /// Whether [`teardown`](Self::teardown) has run
    pub fn is_torn_down(&self) -> bool {
        self.state.read().torn_down
    }

    // Private helper methods

    fn lend_idle(&self, state: &mut PoolState, bucket: usize, size: usize) -> Option<BufferLease> {
        let buffers = state.buckets.get_mut(&bucket)?;
        let buffer = buffers
            .iter_mut()
            .find(|buffer| !buffer.in_use && buffer.capacity >= size)?;
        buffer.lend();
        self.stats.record_hit();
        Some(BufferLease {
            address: buffer.address(),
            capacity: buffer.capacity,
            origin: LeaseOrigin::Pooled,
        })
    }

    fn register_new(&self, state: &mut PoolState, bucket: usize) -> Result<BufferLease> {
        let ptr = self.allocator.allocate(bucket).map_err(|e| {
            self.stats.record_failure();
            DaguerreError::resource_exhaustion(bucket, format!("pooled allocation failed: {}", e))
        })?;

        let buffer = PooledBuffer::new_lent(ptr, bucket);
        let lease = BufferLease {
            address: buffer.address(),
            capacity: bucket,
            origin: LeaseOrigin::Pooled,
        };
        state.buckets.entry(bucket).or_default().push(buffer);
        state.total_buffers += 1;
        self.stats.record_miss(state.total_buffers);

        trace!(address = %lease.address, bucket, total = state.total_buffers, "Registered pooled buffer");
        Ok(lease)
    }

    fn allocate_direct(&self, state: &mut PoolState, size: usize) -> Result<BufferLease> {
        let ptr = self.allocator.allocate(size).map_err(|e| {
            self.stats.record_failure();
            DaguerreError::resource_exhaustion(size, format!("direct allocation failed: {}", e))
        })?;
        let address = BufferAddress::from_ptr(ptr);
        state.direct.insert(address, DirectBlock { ptr, size });
        self.stats.record_direct();

        trace!(%address, size, "Direct allocation");
        Ok(BufferLease {
            address,
            capacity: size,
            origin: LeaseOrigin::Direct,
        })
    }

    fn evict_locked(&self, state: &mut PoolState, aggressive: bool) -> usize {
        let now = Instant::now();
        let max_age = self.config.max_age;
        let mut removed = 0;

        for buffers in state.buckets.values_mut() {
            let mut index = 0;
            while index < buffers.len() {
                if buffers[index].is_evictable(aggressive, now, max_age) {
                    let buffer = buffers.swap_remove(index);
                    // SAFETY: idle pooled buffer, allocated with its capacity.
                    unsafe { self.allocator.deallocate(buffer.ptr, buffer.capacity) };
                    removed += 1;
                } else {
                    index += 1;
                }
            }
        }
        state.buckets.retain(|_, buffers| !buffers.is_empty());
        state.total_buffers -= removed;

        if removed > 0 {
            self.stats.record_evictions(removed, state.total_buffers);
            debug!(removed, aggressive, remaining = state.total_buffers, "Evicted idle buffers");
        }
        removed
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.teardown();
    }
}
