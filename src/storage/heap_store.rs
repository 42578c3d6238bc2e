//! Heap Store - a [`PageStore`] of unordered fixed-size records.
//!
//! Each table is a heap file managed by the [`DiskManager`]; records live in
//! [`HeapPage`] slots. The store holds no cache of its own: every page it
//! reads on behalf of a transaction comes through the [`PageAccess`] handle
//! it is given, so the buffer pool stays the only owner of resident pages.

use std::collections::HashMap;
use std::path::Path;

use log::trace;
use parking_lot::{Mutex, RwLock};

use crate::common::{Error, PageId, Permission, Result, TransactionId};
use crate::storage::page::{HeapPage, Page, PageRef};
use crate::storage::{DiskManager, PageAccess, PageStore, RecordId, Tuple};

/// Heap-file page store.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use lockpool::{BufferPool, HeapStore, TransactionId, Tuple};
///
/// let store = Arc::new(HeapStore::open("my_database")?);
/// store.create_table(1, 8)?;
///
/// let pool = BufferPool::new(16, store);
/// let tid = TransactionId::new();
/// pool.insert_tuple(tid, 1, &mut Tuple::new(*b"8 bytes!"))?;
/// pool.transaction_complete(tid)?;
/// # Ok::<(), lockpool::Error>(())
/// ```
pub struct HeapStore {
    disk: Mutex<DiskManager>,
    tables: RwLock<HashMap<u32, HeapPage>>,
}

impl HeapStore {
    /// Open a heap store rooted at directory `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self {
            disk: Mutex::new(DiskManager::open(dir)?),
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Register table `table_id` holding records of `record_size` bytes.
    ///
    /// The table file is created if it doesn't exist and reopened otherwise.
    pub fn create_table(&self, table_id: u32, record_size: usize) -> Result<()> {
        let layout = HeapPage::new(record_size)?;
        self.disk.lock().open_table(table_id)?;
        self.tables.write().insert(table_id, layout);
        Ok(())
    }

    /// Slot layout of a table.
    pub fn layout(&self, table_id: u32) -> Result<HeapPage> {
        self.tables
            .read()
            .get(&table_id)
            .copied()
            .ok_or(Error::TableNotFound(table_id))
    }

    /// Number of pages in a table.
    pub fn page_count(&self, table_id: u32) -> Result<u32> {
        self.disk.lock().page_count(table_id)
    }

    /// Append a blank page to a table.
    pub fn allocate_page(&self, table_id: u32) -> Result<PageId> {
        self.disk.lock().allocate_page(table_id)
    }

    /// Insert into an already fetched page, or `None` if it has no room.
    fn insert_into(
        &self,
        layout: &HeapPage,
        page: &PageRef,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Option<Page>> {
        let mut page = page.write();
        match layout.insert(&mut page, &tuple.data) {
            Ok(slot) => {
                page.mark_dirty(tid);
                tuple.record_id = Some(RecordId::new(page.id(), slot));
                Ok(Some(page.clone()))
            }
            Err(Error::PageFull(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl PageStore for HeapStore {
    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let mut page = Page::new(page_id);
        self.disk.lock().read_page(page_id, page.as_mut_slice())?;

        if !page.verify_checksum() {
            return Err(Error::ChecksumMismatch(page_id));
        }
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let mut stamped = page.clone();
        stamped.update_checksum();
        self.disk.lock().write_page(page.id(), stamped.as_slice())
    }

    fn insert_tuple(
        &self,
        access: &dyn PageAccess,
        tid: TransactionId,
        table_id: u32,
        tuple: &mut Tuple,
    ) -> Result<Vec<Page>> {
        let layout = self.layout(table_id)?;
        if tuple.data.len() != layout.record_size() {
            return Err(Error::InvalidRecord(format!(
                "table {} stores {}-byte records, got {}",
                table_id,
                layout.record_size(),
                tuple.data.len()
            )));
        }

        // Look for room under a shared lock, upgrade only where it is found.
        let page_count = self.page_count(table_id)?;
        for page_no in 0..page_count {
            let page_id = PageId::new(table_id, page_no);
            let page = access.fetch_page(tid, page_id, Permission::Shared)?;
            let has_room = layout.free_slot(&page.read()).is_some();
            if !has_room {
                continue;
            }

            let page = access.fetch_page(tid, page_id, Permission::Exclusive)?;
            if let Some(dirtied) = self.insert_into(&layout, &page, tid, tuple)? {
                return Ok(vec![dirtied]);
            }
        }

        let page_id = self.allocate_page(table_id)?;
        trace!("{} grew table {} with {}", tid, table_id, page_id);

        let page = access.fetch_page(tid, page_id, Permission::Exclusive)?;
        match self.insert_into(&layout, &page, tid, tuple)? {
            Some(dirtied) => Ok(vec![dirtied]),
            None => Err(Error::PageFull(page_id)),
        }
    }

    fn delete_tuple(
        &self,
        access: &dyn PageAccess,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<Page>> {
        let record_id = tuple
            .record_id
            .ok_or_else(|| Error::InvalidRecord("tuple has no record id".into()))?;
        let layout = self.layout(record_id.page_id.table_id)?;

        let page = access.fetch_page(tid, record_id.page_id, Permission::Exclusive)?;
        let mut page = page.write();
        layout.delete(&mut page, record_id.slot)?;
        page.mark_dirty(tid);

        Ok(vec![page.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Hands out pages straight from the store, without locking or caching.
    struct DirectAccess<'a> {
        store: &'a HeapStore,
    }

    impl PageAccess for DirectAccess<'_> {
        fn fetch_page(&self, _: TransactionId, page_id: PageId, _: Permission) -> Result<PageRef> {
            Ok(Arc::new(RwLock::new(self.store.read_page(page_id)?)))
        }
    }

    fn create_store(record_size: usize) -> (HeapStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = HeapStore::open(dir.path()).unwrap();
        store.create_table(1, record_size).unwrap();
        (store, dir)
    }

    #[test]
    fn test_insert_allocates_first_page() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let tid = TransactionId::new();

        let mut tuple = Tuple::new(*b"abcd");
        let pages = store.insert_tuple(&access, tid, 1, &mut tuple).unwrap();

        assert_eq!(store.page_count(1).unwrap(), 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dirtied_by(), Some(tid));
        assert_eq!(tuple.record_id, Some(RecordId::new(PageId::new(1, 0), 0)));
    }

    #[test]
    fn test_write_then_read_verifies_checksum() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let tid = TransactionId::new();

        let mut tuple = Tuple::new(*b"abcd");
        let pages = store.insert_tuple(&access, tid, 1, &mut tuple).unwrap();
        store.write_page(&pages[0]).unwrap();

        let page = store.read_page(PageId::new(1, 0)).unwrap();
        assert!(!page.is_dirty());
        assert_eq!(store.layout(1).unwrap().read(&page, 0), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_corrupted_page_detected() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let tid = TransactionId::new();

        let pages = store
            .insert_tuple(&access, tid, 1, &mut Tuple::new(*b"abcd"))
            .unwrap();

        // Flip a byte after the checksum was stamped
        let mut stamped = pages[0].clone();
        stamped.update_checksum();
        stamped.as_mut_slice()[2000] ^= 0xFF;
        store
            .disk
            .lock()
            .write_page(PageId::new(1, 0), stamped.as_slice())
            .unwrap();

        assert!(matches!(
            store.read_page(PageId::new(1, 0)),
            Err(Error::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_corrupted_type_byte_detected() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let tid = TransactionId::new();

        let pages = store
            .insert_tuple(&access, tid, 1, &mut Tuple::new(*b"abcd"))
            .unwrap();

        // An unknown type byte decodes as Blank, which must not skip the CRC
        let mut stamped = pages[0].clone();
        stamped.update_checksum();
        stamped.as_mut_slice()[0] = 0x7F;
        stamped.as_mut_slice()[2000] ^= 0xFF;
        store
            .disk
            .lock()
            .write_page(PageId::new(1, 0), stamped.as_slice())
            .unwrap();

        assert!(matches!(
            store.read_page(PageId::new(1, 0)),
            Err(Error::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_allocated_page_reads_as_blank() {
        let (store, _dir) = create_store(4);
        let page_id = store.allocate_page(1).unwrap();

        let page = store.read_page(page_id).unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_unknown_table() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let result = store.insert_tuple(&access, TransactionId::new(), 2, &mut Tuple::new(*b"abcd"));
        assert!(matches!(result, Err(Error::TableNotFound(2))));
    }

    #[test]
    fn test_wrong_record_size() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let result = store.insert_tuple(&access, TransactionId::new(), 1, &mut Tuple::new(*b"abc"));
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
        assert_eq!(store.page_count(1).unwrap(), 0);
    }

    #[test]
    fn test_delete_without_record_id() {
        let (store, _dir) = create_store(4);
        let access = DirectAccess { store: &store };
        let result = store.delete_tuple(&access, TransactionId::new(), &Tuple::new(*b"abcd"));
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }
}
