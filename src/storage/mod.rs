//! Storage layer - the page store collaborator and page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] / [`PageAccess`] - The contract the buffer pool relies on
//! - [`HeapStore`] - A heap-file page store of fixed-size records
//! - [`DiskManager`] - Low-level file I/O
//! - [`page`] - Page types and layouts

mod disk_manager;
mod heap_store;
pub mod page;
mod page_store;

pub use disk_manager::DiskManager;
pub use heap_store::HeapStore;
pub use page_store::{PageAccess, PageStore, RecordId, Tuple};
