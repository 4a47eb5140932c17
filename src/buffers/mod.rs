//! Capture buffer pooling
//!
//! Size-bucketed reuse of native memory blocks that carry photo and preview
//! pixels across the capture boundary.

pub mod buffer;
pub mod config;
pub mod maintenance;
pub mod pool;
pub mod stats;

// Re-export main types
pub use buffer::{BufferAddress, BufferLease, LeaseOrigin};
pub use config::{BufferPoolConfig, BufferPoolConfigBuilder};
pub use maintenance::MaintenanceHandle;
pub use pool::BufferPool;
pub use stats::{AtomicBufferPoolStats, BufferPoolStats};
