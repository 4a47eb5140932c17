//! Heap-backed block allocator

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
};

use crate::error::{DaguerreError, Result};
use super::traits::BlockAllocator;

/// Allocates capture buffers from the global heap with a fixed alignment
#[derive(Debug, Clone, Copy)]
pub struct HeapAllocator {
    alignment: usize,
}

impl HeapAllocator {
    /// Create a heap allocator; `alignment` must be a power of two
    pub fn new(alignment: usize) -> Result<Self> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(DaguerreError::invalid_parameter(
                "alignment",
                "Alignment must be a power of two",
            ));
        }
        Ok(Self { alignment })
    }

    fn layout(&self, size: usize) -> Result<Layout> {
        Layout::from_size_align(size, self.alignment).map_err(|e| {
            DaguerreError::invalid_parameter("size", format!("No layout for {} bytes: {}", size, e))
        })
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self {
            alignment: crate::config::DEFAULT_ALIGNMENT,
        }
    }
}

impl BlockAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(DaguerreError::invalid_parameter(
                "size",
                "Cannot allocate an empty block",
            ));
        }
        let layout = self.layout(size)?;
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        NonNull::new(raw)
            .ok_or_else(|| DaguerreError::memory(format!("Heap refused {} bytes", size)))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        if let Ok(layout) = self.layout(size) {
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }

    fn alignment(&self) -> usize {
        self.alignment
    }
}
