//! Memory allocation traits and utilities

pub mod heap;
pub mod traits;

pub use heap::HeapAllocator;
pub use traits::{BlockAllocator, BlockAllocatorExt};
