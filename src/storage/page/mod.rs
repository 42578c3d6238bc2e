//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The 4KB data container with its dirty state
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`HeapPage`] - Fixed-size record slots inside a page

mod heap_page;
#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use heap_page::HeapPage;
pub use page::{Page, PageRef};
pub use page_header::{PageHeader, PageType};
