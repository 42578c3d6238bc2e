//! Lock Table - page-granularity shared/exclusive locks.
//!
//! The [`LockTable`] is a monitor: every admission check, grant and release
//! happens under one mutex, so two transactions can never both see a
//! conflicting request as admissible.
//!
//! # State
//! ```text
//! grants: TransactionId → { PageId → Permission }
//! counts: PageId        → number of shared grants
//!                         (0 = one exclusive grant, absent = unlocked)
//! ```
//!
//! # Deadlocks
//! There is no wait-for graph. A denied request waits on a condition
//! variable that every release signals, re-checking at least once per
//! retry interval; when the retry budget runs out the request fails with
//! [`Error::Deadlock`]. Slow transactions can be reported as deadlocked.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::common::{Error, PageId, Permission, Result, RetryPolicy, TransactionId};

#[derive(Default)]
struct LockState {
    grants: HashMap<TransactionId, HashMap<PageId, Permission>>,
    counts: HashMap<PageId, usize>,
}

impl LockState {
    fn held(&self, tid: TransactionId, page_id: PageId) -> Option<Permission> {
        self.grants.get(&tid)?.get(&page_id).copied()
    }

    /// Whether `tid` may be granted `perm` on `page_id` right now.
    fn is_lockable(&self, tid: TransactionId, page_id: PageId, perm: Permission) -> bool {
        let count = match self.counts.get(&page_id) {
            None => return true,
            Some(&count) => count,
        };

        match perm {
            // Readers only conflict with a writer other than themselves.
            Permission::Shared => count >= 1 || self.held(tid, page_id).is_some(),
            // With at most one grant outstanding, it is ours or someone else's.
            Permission::Exclusive => count <= 1 && self.held(tid, page_id).is_some(),
        }
    }

    fn grant(&mut self, tid: TransactionId, page_id: PageId, perm: Permission) {
        let held = self.grants.entry(tid).or_default();
        match (perm, held.get(&page_id).copied()) {
            (Permission::Shared, None) => {
                *self.counts.entry(page_id).or_insert(0) += 1;
                held.insert(page_id, Permission::Shared);
            }
            // Any existing grant already covers a shared request.
            (Permission::Shared, Some(_)) => {}
            (Permission::Exclusive, _) => {
                self.counts.insert(page_id, 0);
                held.insert(page_id, Permission::Exclusive);
            }
        }
    }

    /// Drop one grant. Returns false if `tid` held nothing on `page_id`.
    fn release(&mut self, tid: TransactionId, page_id: PageId) -> bool {
        let Some(held) = self.grants.get_mut(&tid) else {
            return false;
        };
        if held.remove(&page_id).is_none() {
            return false;
        }
        if held.is_empty() {
            self.grants.remove(&tid);
        }

        match self.counts.get(&page_id).copied() {
            Some(0) | Some(1) => {
                self.counts.remove(&page_id);
            }
            Some(n) => {
                self.counts.insert(page_id, n - 1);
            }
            None => {}
        }
        true
    }
}

/// Page-level two-phase lock manager shared by all transactions.
///
/// # Example
/// ```
/// use lockpool::{LockTable, PageId, Permission, TransactionId};
///
/// let locks = LockTable::default();
/// let (t1, t2) = (TransactionId::new(), TransactionId::new());
/// let page = PageId::new(0, 0);
///
/// locks.acquire(t1, page, Permission::Shared).unwrap();
/// locks.acquire(t2, page, Permission::Shared).unwrap();
/// assert!(!locks.try_acquire(t1, page, Permission::Exclusive));
///
/// locks.release_all(t2, true);
/// assert!(locks.try_acquire(t1, page, Permission::Exclusive));
/// ```
pub struct LockTable {
    state: Mutex<LockState>,
    released: Condvar,
    retry: RetryPolicy,
}

impl LockTable {
    /// Create an empty lock table using `retry` for blocked requests.
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
            retry,
        }
    }

    /// The policy applied to blocked requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Acquire `perm` on `page_id` for `tid`, blocking while it conflicts.
    ///
    /// Re-acquiring a held lock is a no-op; a sole shared holder asking for
    /// exclusive is upgraded in place.
    ///
    /// # Errors
    /// `Error::Deadlock` if the request is still denied once the retry
    /// budget is spent. Locks already held by `tid` are untouched.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, perm: Permission) -> Result<()> {
        // `None` when the budget is too large to represent: wait indefinitely.
        let deadline = Instant::now().checked_add(self.retry.max_wait());
        let mut attempts = 0;
        let mut state = self.state.lock();

        loop {
            if state.is_lockable(tid, page_id, perm) {
                state.grant(tid, page_id, perm);
                trace!("{} granted {} on {}", tid, perm, page_id);
                return Ok(());
            }

            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                let attempts = attempts.min(self.retry.max_attempts);
                warn!(
                    "{} timed out waiting for {} on {} after {} attempts",
                    tid, perm, page_id, attempts
                );
                return Err(Error::Deadlock {
                    tid,
                    page_id,
                    attempts,
                });
            }

            // Only a wait that runs its full interval counts as an attempt;
            // releases of unrelated pages also wake us.
            let wake_at = now
                .checked_add(self.retry.retry_interval)
                .map(|wake_at| deadline.map_or(wake_at, |deadline| wake_at.min(deadline)));
            let timed_out = match wake_at {
                Some(wake_at) => self.released.wait_until(&mut state, wake_at).timed_out(),
                None => {
                    self.released.wait(&mut state);
                    false
                }
            };
            if timed_out {
                attempts += 1;
            }
        }
    }

    /// Grant `perm` if it is admissible right now, without waiting.
    pub fn try_acquire(&self, tid: TransactionId, page_id: PageId, perm: Permission) -> bool {
        let mut state = self.state.lock();
        if state.is_lockable(tid, page_id, perm) {
            state.grant(tid, page_id, perm);
            true
        } else {
            false
        }
    }

    /// Release the lock `tid` holds on `page_id`, if any.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        let released = self.state.lock().release(tid, page_id);
        if released {
            self.released.notify_all();
        }
    }

    /// Release every lock `tid` holds.
    ///
    /// `commit` is informational; locks go away whatever the outcome.
    pub fn release_all(&self, tid: TransactionId, commit: bool) {
        let count = {
            let mut state = self.state.lock();
            let page_ids: Vec<PageId> = match state.grants.get(&tid) {
                Some(held) => held.keys().copied().collect(),
                None => return,
            };
            for page_id in &page_ids {
                state.release(tid, *page_id);
            }
            page_ids.len()
        };

        trace!(
            "{} released {} locks ({})",
            tid,
            count,
            if commit { "commit" } else { "abort" }
        );
        self.released.notify_all();
    }

    /// Whether `tid` holds any lock on `page_id`.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.state.lock().held(tid, page_id).is_some()
    }

    /// The mode `tid` holds on `page_id`.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<Permission> {
        self.state.lock().held(tid, page_id)
    }

    /// Snapshot of the pages `tid` holds locks on.
    pub fn locks_held_by(&self, tid: TransactionId) -> HashSet<PageId> {
        self.state
            .lock()
            .grants
            .get(&tid)
            .map(|held| held.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every transaction holding a lock on `page_id`, with its mode.
    pub fn holders(&self, page_id: PageId) -> Vec<(TransactionId, Permission)> {
        let state = self.state.lock();
        state
            .grants
            .iter()
            .filter_map(|(tid, held)| held.get(&page_id).map(|perm| (*tid, *perm)))
            .collect()
    }

    /// Number of shared grants on `page_id`: `Some(0)` while an exclusive
    /// grant is held, `None` while unlocked.
    pub fn shared_count(&self, page_id: PageId) -> Option<usize> {
        self.state.lock().counts.get(&page_id).copied()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
