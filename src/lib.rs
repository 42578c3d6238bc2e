//! lockpool - A page buffer pool with page-level two-phase locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            lockpool                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Transactions (concurrency/)                    │   │
//! │  │     TransactionId + Transaction (commit / abort)         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)                              │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │  LockTable: S/X page locks, timeout = deadlock  │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │      BufferPool + clean-only eviction + Statistics       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   PageStore trait → HeapStore → DiskManager + Page       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, TransactionId, Permission, Error, config)
//! - [`buffer`] - The buffer pool and its statistics
//! - [`concurrency`] - Lock table and transaction handle
//! - [`storage`] - Page store contract, heap files and page formats
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use lockpool::{BufferPool, HeapStore, PageId, Permission, Transaction, Tuple};
//!
//! let store = Arc::new(HeapStore::open("my_database")?);
//! store.create_table(1, 16)?;
//! let pool = BufferPool::new(50, store);
//!
//! let txn = Transaction::begin();
//! pool.insert_tuple(txn.id(), 1, &mut Tuple::new([7u8; 16]))?;
//! txn.commit(&pool)?;
//!
//! let reader = Transaction::begin();
//! let page = pool.fetch_page(reader.id(), PageId::new(1, 0), Permission::Shared)?;
//! assert!(!page.read().is_dirty());
//! drop(page);
//! reader.commit(&pool)?;
//! # Ok::<(), lockpool::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, Error, PageId, Permission, Result, RetryPolicy, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, StatsSnapshot};
pub use concurrency::{CommitError, LockTable, Transaction};
pub use storage::page::{HeapPage, Page, PageHeader, PageRef, PageType};
pub use storage::{DiskManager, HeapStore, PageAccess, PageStore, RecordId, Tuple};
