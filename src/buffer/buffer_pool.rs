//! Buffer Pool - the lock-gated page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between the page store and memory, bounded at `num_pages`
//! - Lock admission through the [`LockTable`] on every fetch
//! - Clean-only eviction
//! - Commit (flush) and abort (discard) before lock release

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::buffer::BufferPoolStats;
use crate::common::{
    BufferPoolConfig, Error, PageId, Permission, Result, TransactionId,
};
use crate::concurrency::LockTable;
use crate::storage::page::{Page, PageRef};
use crate::storage::{PageAccess, PageStore, Tuple};

type PageTable = HashMap<PageId, PageRef>;

/// A fixed-capacity page cache shared by concurrent transactions.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BufferPool                          │
/// │  ┌──────────────────────┐    ┌───────────────────────────┐  │
/// │  │ lock_table           │    │ pages: Mutex<PageTable>   │  │
/// │  │ tid → {pid → S|X}    │───▶│ PageId → Arc<RwLock<Page>>│  │
/// │  │ pid → shared count   │    │ (at most num_pages)       │  │
/// │  └──────────────────────┘    └─────────────┬─────────────┘  │
/// │                                            │ read / write   │
/// │                              ┌─────────────▼─────────────┐  │
/// │                              │ store: Arc<dyn PageStore> │  │
/// │                              └───────────────────────────┘  │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `lock_table`: its own monitor; the only place a caller ever blocks
/// - `pages`: `Mutex`, serializing fetch, eviction, flush and discard
/// - page contents: `RwLock` per page, taken only after `pages`
/// - `stats`: No lock (atomic counters)
///
/// Lock order is lock table, then `pages`, then a page. The lock table's
/// mutex is never held while waiting for `pages`, and callers must drop
/// their page guards before calling back into the pool.
///
/// # Usage
/// ```ignore
/// let pool = BufferPool::new(50, store);
/// let tid = TransactionId::new();
///
/// let page = pool.fetch_page(tid, page_id, Permission::Shared)?;
/// let first_byte = page.read().as_slice()[0];
///
/// pool.transaction_complete(tid)?;
/// ```
pub struct BufferPool {
    /// Resident pages.
    pages: Mutex<PageTable>,

    /// Page locks of every running transaction.
    lock_table: LockTable,

    /// Where pages come from and go to.
    store: Arc<dyn PageStore>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Maximum number of resident pages (immutable after construction).
    num_pages: usize,
}

impl BufferPool {
    /// Create a pool caching up to `num_pages` pages of `store`, with the
    /// default lock retry policy.
    ///
    /// # Panics
    /// Panics if `num_pages` is 0.
    pub fn new(num_pages: usize, store: Arc<dyn PageStore>) -> Self {
        Self::with_config(BufferPoolConfig::new(num_pages), store)
    }

    /// Create a pool from a full configuration.
    ///
    /// # Panics
    /// Panics if `config.num_pages` is 0.
    pub fn with_config(config: BufferPoolConfig, store: Arc<dyn PageStore>) -> Self {
        assert!(config.num_pages > 0, "num_pages must be > 0");

        Self {
            pages: Mutex::new(HashMap::with_capacity(config.num_pages)),
            lock_table: LockTable::new(config.retry),
            store,
            stats: BufferPoolStats::new(),
            num_pages: config.num_pages,
        }
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Fetch a page on behalf of `tid`, first acquiring `perm` on it.
    ///
    /// Blocks while another transaction holds a conflicting lock. A resident
    /// page is returned as is; otherwise it is loaded from the store,
    /// evicting a clean page if the pool is full.
    ///
    /// # Errors
    /// - `Error::Deadlock` if the lock could not be granted in time; abort `tid`
    /// - `Error::NoEvictablePage` if the pool is full of dirty pages
    /// - Store errors (`PageNotFound`, I/O, checksum) verbatim
    pub fn fetch_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> Result<PageRef> {
        if let Err(e) = self.lock_table.acquire(tid, page_id, perm) {
            BufferPoolStats::bump(&self.stats.lock_timeouts);
            return Err(e);
        }

        let mut pages = self.pages.lock();
        if let Some(page) = pages.get(&page_id) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            trace!("{} hit {}", tid, page_id);
            return Ok(Arc::clone(page));
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        trace!("{} missed {}", tid, page_id);

        let page = self.store.read_page(page_id)?;
        BufferPoolStats::bump(&self.stats.pages_read);

        if pages.len() >= self.num_pages {
            self.evict_page(&mut pages)?;
        }

        let page = Arc::new(RwLock::new(page));
        pages.insert(page_id, Arc::clone(&page));
        Ok(page)
    }

    /// Release `tid`'s lock on `page_id` before the transaction ends.
    ///
    /// This breaks two-phase locking: another transaction may then see or
    /// overwrite state `tid` has not committed. Only use it on pages whose
    /// content `tid` neither changed nor depends on.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_table.release(tid, page_id);
    }

    /// Whether `tid` holds a lock on `page_id`.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_table.holds_lock(tid, page_id)
    }

    // ========================================================================
    // Public API: Record mutations
    // ========================================================================

    /// Insert `tuple` into table `table_id` on behalf of `tid`.
    ///
    /// The store locks (exclusively) every page it modifies through this
    /// pool; the modified pages are then marked dirty by `tid` and cached.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: u32, tuple: &mut Tuple) -> Result<()> {
        let dirtied = self.store.insert_tuple(self, tid, table_id, tuple)?;
        self.cache_dirtied(tid, dirtied)
    }

    /// Delete `tuple` from its table on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let dirtied = self.store.delete_tuple(self, tid, tuple)?;
        self.cache_dirtied(tid, dirtied)
    }

    /// Mark pages returned by a mutation dirty and make them resident.
    ///
    /// Room for every non-resident page is found before any page is
    /// touched, so either all of them end up cached or none does.
    fn cache_dirtied(&self, tid: TransactionId, dirtied: Vec<Page>) -> Result<()> {
        let mut pages = self.pages.lock();

        let touched: HashSet<PageId> = dirtied.iter().map(Page::id).collect();
        let missing = touched.iter().filter(|pid| !pages.contains_key(*pid)).count();
        let overflow = (pages.len() + missing).saturating_sub(self.num_pages);

        let victims = self.find_victims(&pages, overflow, &touched)?;
        for victim in victims {
            self.evict(&mut pages, victim)?;
        }

        for mut page in dirtied {
            page.mark_dirty(tid);
            match pages.get(&page.id()) {
                Some(cached) => *cached.write() = page,
                None => {
                    pages.insert(page.id(), Arc::new(RwLock::new(page)));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Transaction completion
    // ========================================================================

    /// Commit `tid`: flush its pages, then release its locks.
    pub fn transaction_complete(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete_with(tid, true)
    }

    /// Commit or abort `tid`, then release all its locks.
    ///
    /// On commit every page `tid` locked or dirtied is written to the store.
    /// On abort every such page is dropped from the cache unwritten, so the
    /// next fetch reloads the last committed content.
    ///
    /// # Errors
    /// A failed write during commit is returned with `tid`'s locks still
    /// held and some of its pages possibly written. The outcome is then
    /// ambiguous; the caller may still abort to release the locks.
    pub fn transaction_complete_with(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let locked = self.lock_table.locks_held_by(tid);

        {
            let mut pages = self.pages.lock();

            let mut affected: Vec<PageId> = locked.into_iter().collect();
            affected.extend(Self::dirtied_by(&pages, tid));
            affected.sort();
            affected.dedup();

            for page_id in &affected {
                if commit {
                    if let Some(page) = pages.get(page_id) {
                        self.flush(page)?;
                    }
                } else if pages.remove(page_id).is_some() {
                    BufferPoolStats::bump(&self.stats.discards);
                }
            }

            debug!(
                "{} {} over {} pages",
                tid,
                if commit { "committed" } else { "aborted" },
                affected.len()
            );
        }

        self.lock_table.release_all(tid, commit);
        Ok(())
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Write a resident page to the store if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let pages = self.pages.lock();
        match pages.get(&page_id) {
            Some(page) => self.flush(page),
            None => Ok(()),
        }
    }

    /// Write every resident page dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let pages = self.pages.lock();
        for page_id in Self::dirtied_by(&pages, tid) {
            if let Some(page) = pages.get(&page_id) {
                self.flush(page)?;
            }
        }
        Ok(())
    }

    /// Write every dirty resident page.
    ///
    /// This persists uncommitted changes too; it is meant for checkpoints
    /// and shutdown, not for transaction completion.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages = self.pages.lock();
        for page in pages.values() {
            self.flush(page)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it, dirty or not.
    pub fn discard_page(&self, page_id: PageId) {
        if self.pages.lock().remove(&page_id).is_some() {
            BufferPoolStats::bump(&self.stats.discards);
            debug!("discarded {}", page_id);
        }
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Maximum number of resident pages.
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Number of pages currently resident.
    pub fn resident_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Whether `page_id` is currently resident.
    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    /// The pool's lock table.
    pub fn lock_table(&self) -> &LockTable {
        &self.lock_table
    }

    // ========================================================================
    // Internal: Eviction and write-back
    // ========================================================================

    /// Resident pages currently marked dirty by `tid`.
    fn dirtied_by(pages: &PageTable, tid: TransactionId) -> Vec<PageId> {
        pages
            .iter()
            .filter(|(_, page)| page.read().dirtied_by() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Pick `count` clean pages outside `exclude`, or fail if there are not
    /// that many.
    ///
    /// Which clean pages are picked is unspecified.
    fn find_victims(
        &self,
        pages: &PageTable,
        count: usize,
        exclude: &HashSet<PageId>,
    ) -> Result<Vec<PageId>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let victims: Vec<PageId> = pages
            .iter()
            .filter(|(pid, page)| !exclude.contains(*pid) && !page.read().is_dirty())
            .map(|(pid, _)| *pid)
            .take(count)
            .collect();

        if victims.len() < count {
            warn!(
                "cannot evict {} pages: only {} of {} resident pages are clean",
                count,
                victims.len(),
                pages.len()
            );
            return Err(Error::NoEvictablePage {
                capacity: self.num_pages,
            });
        }
        Ok(victims)
    }

    /// Evict one clean page.
    fn evict_page(&self, pages: &mut PageTable) -> Result<()> {
        let victims = self.find_victims(pages, 1, &HashSet::new())?;
        for victim in victims {
            self.evict(pages, victim)?;
        }
        Ok(())
    }

    fn evict(&self, pages: &mut PageTable, page_id: PageId) -> Result<()> {
        if let Some(page) = pages.get(&page_id) {
            // Victims are clean, so this writes nothing.
            self.flush(page)?;
        }
        pages.remove(&page_id);
        BufferPoolStats::bump(&self.stats.evictions);
        debug!("evicted {}", page_id);
        Ok(())
    }

    /// Write a page to the store if it is dirty, then mark it clean.
    fn flush(&self, page: &PageRef) -> Result<()> {
        let mut page = page.write();
        if page.is_dirty() {
            self.store.write_page(&page)?;
            page.mark_clean();
            BufferPoolStats::bump(&self.stats.pages_written);
        }
        Ok(())
    }
}

impl PageAccess for BufferPool {
    fn fetch_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> Result<PageRef> {
        BufferPool::fetch_page(self, tid, page_id, perm)
    }
}
