//! Page - the fundamental 4KB unit of caching and storage.
//!
//! A [`Page`] is a 4KB byte block plus the bookkeeping the buffer pool needs
//! while it is resident: which page it is, and which transaction (if any)
//! has dirtied it since it was last written.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, TransactionId};

use super::page_header::PageHeader;

/// Shared handle to a page resident in the buffer pool.
///
/// The lock table decides who may touch a page; the `RwLock` only makes the
/// in-place mutation memory-safe.
pub type PageRef = Arc<RwLock<Page>>;

/// A page of data with its dirty state.
///
/// Cloning a page copies its 4KB of data; this is how content is handed to
/// and from a page store.
///
/// # Example
/// ```
/// use lockpool::{Page, PageId, TransactionId};
///
/// let mut page = Page::new(PageId::new(0, 0));
/// page.as_mut_slice()[100] = 0xFF;
///
/// let tid = TransactionId::new();
/// page.mark_dirty(tid);
/// assert_eq!(page.dirtied_by(), Some(tid));
///
/// page.mark_clean();
/// assert!(!page.is_dirty());
/// ```
#[derive(Clone)]
pub struct Page {
    id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    dirtied_by: Option<TransactionId>,
}

impl Page {
    /// Create a new zeroed, clean page.
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            data: Box::new([0u8; PAGE_SIZE]),
            dirtied_by: None,
        }
    }

    /// The page's identifier.
    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }

    /// Get mutable slice of page data.
    ///
    /// Writing through this does not mark the page dirty.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Record that `tid` modified this page.
    #[inline]
    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtied_by = Some(tid);
    }

    /// Clear the dirty flag, typically after the page was written.
    #[inline]
    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }

    /// Whether the page has unwritten modifications.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    /// The transaction that last dirtied the page.
    #[inline]
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    // ========================================================================
    // Header
    // ========================================================================

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data[..])
    }

    /// Write a page header.
    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data[..]);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data[..]);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data[..])
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("dirtied_by", &self.dirtied_by)
            .finish_non_exhaustive()
    }
}
