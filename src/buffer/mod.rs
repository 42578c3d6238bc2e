//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between transactions and the page
//! store. Every page it hands out is first locked in the pool's lock table.
//!
//! # Components
//! - [`BufferPool`] - The lock-gated page cache
//! - [`BufferPoolStats`] - Performance statistics

mod buffer_pool;
mod stats;

pub use buffer_pool::BufferPool;
pub use stats::{BufferPoolStats, StatsSnapshot};
