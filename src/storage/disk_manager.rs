//! Disk Manager - low-level file I/O for table pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - One file per table inside a database directory
//! - Reading and writing pages
//! - Allocating new pages at the end of a table

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};

/// An open table file and its length in pages.
struct TableFile {
    file: File,
    page_count: u32,
}

/// Manages disk I/O for the table files of one database directory.
///
/// # File Layout
/// Each table lives in `<dir>/<table_id>.tbl` with pages laid out
/// sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. Whoever shares it (the heap store)
/// is responsible for serializing access.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskManager {
    dir: PathBuf,
    tables: HashMap<u32, TableFile>,
}

impl DiskManager {
    /// Open a database directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            tables: HashMap::new(),
        })
    }

    /// Path of the file backing `table_id`.
    pub fn table_path(&self, table_id: u32) -> PathBuf {
        self.dir.join(format!("{}.tbl", table_id))
    }

    /// Open the file of `table_id`, creating an empty one if it doesn't exist.
    ///
    /// Opening an already open table is a no-op.
    pub fn open_table(&mut self, table_id: u32) -> Result<()> {
        if self.tables.contains_key(&table_id) {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.table_path(table_id))?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        self.tables.insert(table_id, TableFile { file, page_count });
        Ok(())
    }

    fn table_mut(&mut self, table_id: u32) -> Result<&mut TableFile> {
        self.tables
            .get_mut(&table_id)
            .ok_or(Error::TableNotFound(table_id))
    }

    /// Read a page from disk into `buf`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let table = self.table_mut(page_id.table_id)?;
        if page_id.page_no >= table.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        let offset = (page_id.page_no as u64) * (PAGE_SIZE as u64);
        table.file.seek(SeekFrom::Start(offset))?;
        table.file.read_exact(&mut buf[..PAGE_SIZE])?;

        Ok(())
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        let table = self.table_mut(page_id.table_id)?;
        if page_id.page_no >= table.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        let offset = (page_id.page_no as u64) * (PAGE_SIZE as u64);
        table.file.seek(SeekFrom::Start(offset))?;
        table.file.write_all(&data[..PAGE_SIZE])?;
        table.file.sync_all()?;

        Ok(())
    }

    /// Append a zeroed page to a table and return its id.
    pub fn allocate_page(&mut self, table_id: u32) -> Result<PageId> {
        let table = self.table_mut(table_id)?;
        let page_id = PageId::new(table_id, table.page_count);

        let offset = (page_id.page_no as u64) * (PAGE_SIZE as u64);
        table.file.seek(SeekFrom::Start(offset))?;
        table.file.write_all(&[0u8; PAGE_SIZE])?;
        table.file.sync_all()?;

        table.page_count += 1;
        Ok(page_id)
    }

    /// Number of pages in a table.
    pub fn page_count(&self, table_id: u32) -> Result<u32> {
        self.tables
            .get(&table_id)
            .map(|t| t.page_count)
            .ok_or(Error::TableNotFound(table_id))
    }
}
