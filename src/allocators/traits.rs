//! Allocator trait definition

use std::ptr::NonNull;
use crate::error::Result;

/// Source of the raw memory blocks that back pooled and direct capture buffers
pub trait BlockAllocator: Send + Sync + std::fmt::Debug {
    /// Allocate `size` bytes. Must fail rather than return a dangling block.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>>;

    /// Return a block obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this allocator with the same `size`,
    /// and must not be used or deallocated again afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);

    /// Alignment every block is guaranteed to have
    fn alignment(&self) -> usize {
        std::mem::align_of::<usize>()
    }

    /// Get allocator type name for debugging
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Common allocator operations
pub trait BlockAllocatorExt: BlockAllocator {
    /// Allocate and zero-initialize a block
    fn allocate_zeroed(&self, size: usize) -> Result<NonNull<u8>> {
        let ptr = self.allocate(size)?;
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0, size);
        }
        Ok(ptr)
    }
}

impl<T: BlockAllocator + ?Sized> BlockAllocatorExt for T {}
