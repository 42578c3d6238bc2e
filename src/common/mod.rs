//! Common types and utilities shared across lockpool.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and tuning knobs
//! - Error types
//! - Identifiers (PageId, TransactionId) and access modes (Permission)

pub mod config;
pub mod error;
mod page_id;
mod permission;
mod transaction_id;

pub use config::{BufferPoolConfig, RetryPolicy};
pub use error::{Error, Result};
pub use page_id::PageId;
pub use permission::Permission;
pub use transaction_id::TransactionId;
