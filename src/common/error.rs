//! Error types for lockpool.

use thiserror::Error;

use crate::common::{PageId, TransactionId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in lockpool.
///
/// Callers only need to tell three situations apart: the transaction must
/// abort ([`Error::is_abort`]), the storage underneath failed
/// ([`Error::is_storage`]), or the request itself was malformed. Lock
/// contention never surfaces; it is absorbed by blocking.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the page store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the page store.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// Requested table is unknown to the page store.
    #[error("Table {0} not found")]
    TableNotFound(u32),

    /// A lock request stayed denied for the whole retry budget.
    ///
    /// The requesting transaction is presumed deadlocked and must be aborted
    /// with `transaction_complete_with(tid, false)`.
    #[error("{tid} gave up waiting for a lock on {page_id} after {attempts} attempts")]
    Deadlock {
        tid: TransactionId,
        page_id: PageId,
        attempts: u32,
    },

    /// The pool is full and every resident page is dirty.
    #[error("No evictable page: all {capacity} resident pages are dirty")]
    NoEvictablePage { capacity: usize },

    /// A page read back from the store failed checksum verification.
    #[error("Checksum mismatch on {0}")]
    ChecksumMismatch(PageId),

    /// A page has no free record slot.
    #[error("{0} has no free slot")]
    PageFull(PageId),

    /// A record does not fit the table or does not exist.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Whether the error requires the current transaction to abort.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Deadlock { .. } | Error::NoEvictablePage { .. })
    }

    /// Whether the error comes from the storage underneath the pool.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::PageNotFound(_) | Error::ChecksumMismatch(_)
        )
    }
}
