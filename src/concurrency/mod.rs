//! Concurrency control: page-level two-phase locking.
//!
//! # Components
//! - [`LockTable`] - Shared/exclusive page locks with timeout-based deadlock detection
//! - [`Transaction`] - A handle that ends a transaction exactly once

mod lock_table;
mod transaction;

pub use lock_table::LockTable;
pub use transaction::{CommitError, Transaction};
