//! Buffer pool statistics tracking

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of buffer pool counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferPoolStats {
    /// Buffers currently registered in buckets
    pub pooled_buffers: usize,
    /// Highest number of registered buffers seen
    pub peak_buffers: usize,
    /// Acquires served by reusing an idle pooled buffer
    pub hits: u64,
    /// Acquires that registered a new pooled buffer
    pub misses: u64,
    /// Acquires served outside the pool (out of range or at capacity)
    pub direct_allocations: u64,
    /// Releases processed
    pub releases: u64,
    /// Buffers evicted by maintenance
    pub evictions: u64,
    /// Aggressive passes forced by an acquire at capacity
    pub pressure_evictions: u64,
    /// Allocation failures propagated to callers
    pub allocation_failures: u64,
}

impl BufferPoolStats {
    /// Fraction of pooled acquires that reused a buffer (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let pooled = self.hits + self.misses;
        if pooled == 0 {
            return 0.0;
        }
        self.hits as f64 / pooled as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "BufferPoolStats {{ buffers: {}, peak: {}, hits: {}, misses: {}, direct: {}, \
             releases: {}, evictions: {}, failures: {}, hit_rate: {:.2}% }}",
            self.pooled_buffers,
            self.peak_buffers,
            self.hits,
            self.misses,
            self.direct_allocations,
            self.releases,
            self.evictions,
            self.allocation_failures,
            self.hit_rate() * 100.0
        )
    }
}

/// Thread-safe counters for the buffer pool
#[derive(Debug, Default)]
pub struct AtomicBufferPoolStats {
    pub(crate) pooled_buffers: AtomicUsize,
    pub(crate) peak_buffers: AtomicUsize,
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) direct_allocations: AtomicU64,
    pub(crate) releases: AtomicU64,
    pub(crate) evictions: AtomicU64,
    pub(crate) pressure_evictions: AtomicU64,
    pub(crate) allocation_failures: AtomicU64,
}

impl AtomicBufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self, pooled_buffers: usize) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.set_pooled(pooled_buffers);
    }

    pub(crate) fn record_direct(&self) {
        self.direct_allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize, pooled_buffers: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        self.set_pooled(pooled_buffers);
    }

    pub(crate) fn record_pressure_pass(&self) {
        self.pressure_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_pooled(&self, pooled_buffers: usize) {
        self.pooled_buffers.store(pooled_buffers, Ordering::Relaxed);
        self.peak_buffers.fetch_max(pooled_buffers, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> BufferPoolStats {
        BufferPoolStats {
            pooled_buffers: self.pooled_buffers.load(Ordering::Relaxed),
            peak_buffers: self.peak_buffers.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            direct_allocations: self.direct_allocations.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pressure_evictions: self.pressure_evictions.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}
