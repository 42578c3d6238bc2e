//! Page identifier type.

use std::fmt;

/// Identifies a page: the table it belongs to and its position in that table.
///
/// Equality and hashing over both fields define the keys of the buffer pool
/// cache and of the lock table.
///
/// # Example
/// ```
/// use lockpool::PageId;
///
/// let page_id = PageId::new(7, 42);
/// assert_eq!(page_id.table_id, 7);
/// assert_eq!(page_id.page_no, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// Table the page belongs to.
    pub table_id: u32,
    /// Zero-based page number within the table.
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table_id: u32, page_no: u32) -> Self {
        PageId { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id, self.page_no)
    }
}
