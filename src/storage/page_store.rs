//! The contract between the buffer pool and durable storage.
//!
//! A [`PageStore`] knows how pages are laid out on disk and how records map
//! onto pages. The buffer pool knows neither; it only caches what the store
//! hands it and tells the store when to write.
//!
//! Record mutations run *through* the pool: the store receives a
//! [`PageAccess`] handle and fetches every page it touches with it, so each
//! page is locked by the mutating transaction before it is modified.

use crate::common::{PageId, Permission, Result, TransactionId};
use crate::storage::page::{Page, PageRef};

/// Location of a record: its page and slot within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

/// A record and, once stored, where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    /// Set by a successful insert; required by delete.
    pub record_id: Option<RecordId>,
    /// Raw record bytes.
    pub data: Vec<u8>,
}

impl Tuple {
    /// A tuple that has not been stored yet.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            record_id: None,
            data: data.into(),
        }
    }
}

/// Lock-checked page access, as offered by the buffer pool.
pub trait PageAccess {
    /// Fetch `page_id` on behalf of `tid`, first acquiring `perm` on it.
    fn fetch_page(&self, tid: TransactionId, page_id: PageId, perm: Permission)
        -> Result<PageRef>;
}

/// Durable page storage.
///
/// Implementations must be safe to share between threads; the pool calls
/// them from whatever thread a transaction runs on.
pub trait PageStore: Send + Sync {
    /// Load a page.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page does not exist.
    fn read_page(&self, page_id: PageId) -> Result<Page>;

    /// Persist the full content of a page. Writing the same page twice is
    /// harmless.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Add `tuple` to table `table_id` and set its record id.
    ///
    /// Returns every page the insert modified.
    fn insert_tuple(
        &self,
        access: &dyn PageAccess,
        tid: TransactionId,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> Result<Vec<Page>>;

    /// Remove `tuple` (located by its record id) from its table.
    ///
    /// Returns every page the delete modified.
    fn delete_tuple(
        &self,
        access: &dyn PageAccess,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<Page>>;
}
