//! Transaction handle.

use log::{debug, warn};
use thiserror::Error;

use crate::buffer::BufferPool;
use crate::common::{Error, Result, TransactionId};

/// A running transaction.
///
/// A thin owner of a [`TransactionId`]: the pool does all the work, the
/// handle only makes sure a transaction ends exactly once. Dropping a
/// handle without committing or aborting leaves its locks held.
///
/// # Example
/// ```ignore
/// let txn = Transaction::begin();
/// let page = pool.fetch_page(txn.id(), page_id, Permission::Shared)?;
/// // ...
/// txn.commit(&pool)?;
/// ```
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
}

/// A commit that did not complete.
///
/// The transaction still holds its locks and is handed back so it can be
/// aborted. Converting into [`Error`] drops the handle along with that
/// chance.
#[derive(Debug, Error)]
#[error("commit failed: {error}")]
pub struct CommitError {
    /// The transaction, still running.
    pub transaction: Transaction,
    #[source]
    pub error: Error,
}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        e.error
    }
}

impl Transaction {
    /// Start a transaction with a fresh id.
    pub fn begin() -> Self {
        let id = TransactionId::new();
        debug!("{} began", id);
        Self { id }
    }

    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Flush everything this transaction touched, then release its locks.
    ///
    /// # Errors
    /// On a failed flush the transaction comes back inside the error with
    /// its locks held; some of its pages may already be written.
    pub fn commit(self, pool: &BufferPool) -> std::result::Result<(), CommitError> {
        match pool.transaction_complete_with(self.id, true) {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!("{} failed to commit: {}", self.id, error);
                Err(CommitError {
                    transaction: self,
                    error,
                })
            }
        }
    }

    /// Discard everything this transaction touched, then release its locks.
    pub fn abort(self, pool: &BufferPool) -> Result<()> {
        pool.transaction_complete_with(self.id, false)
    }
}
