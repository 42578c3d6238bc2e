//! Fixed-size record slots inside a page.
//!
//! # Layout
//! ```text
//! ┌────────────┬──────────────────┬────────┬────────┬─────┬────────┐
//! │ PageHeader │ occupancy bitmap │ slot 0 │ slot 1 │ ... │ slot N │
//! │  8 bytes   │ ceil(N / 8) bytes│        │        │     │        │
//! └────────────┴──────────────────┴────────┴────────┴─────┴────────┘
//! ```
//!
//! Each slot costs `record_size` bytes plus one bitmap bit, so a page holds
//! `floor((PAGE_SIZE - header) * 8 / (record_size * 8 + 1))` records.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Result};

use super::page::Page;
use super::page_header::{PageHeader, PageType};

/// Slot arithmetic for heap pages holding records of one size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPage {
    record_size: usize,
    slot_count: usize,
}

impl HeapPage {
    /// Largest record a heap page can hold (one slot per page).
    pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - PageHeader::SIZE - 1;

    /// Layout for records of `record_size` bytes.
    pub fn new(record_size: usize) -> Result<Self> {
        if record_size == 0 || record_size > Self::MAX_RECORD_SIZE {
            return Err(Error::InvalidRecord(format!(
                "record size {} outside 1..={}",
                record_size,
                Self::MAX_RECORD_SIZE
            )));
        }

        let slot_count = ((PAGE_SIZE - PageHeader::SIZE) * 8) / (record_size * 8 + 1);
        Ok(Self {
            record_size,
            slot_count,
        })
    }

    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Number of record slots per page.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[inline]
    fn bitmap_len(&self) -> usize {
        self.slot_count.div_ceil(8)
    }

    #[inline]
    fn slot_offset(&self, slot: usize) -> usize {
        PageHeader::SIZE + self.bitmap_len() + slot * self.record_size
    }

    /// Stamp a heap header on a blank page; check the record size otherwise.
    pub fn format(&self, page: &mut Page) -> Result<()> {
        let header = page.header();
        match header.page_type {
            PageType::Blank => {
                page.set_header(&PageHeader::heap(self.record_size as u16));
                Ok(())
            }
            PageType::Heap if header.record_size as usize == self.record_size => Ok(()),
            PageType::Heap => Err(Error::InvalidRecord(format!(
                "{} holds {}-byte records, not {}",
                page.id(),
                header.record_size,
                self.record_size
            ))),
        }
    }

    /// Whether `slot` holds a record.
    pub fn is_used(&self, page: &Page, slot: usize) -> bool {
        if slot >= self.slot_count {
            return false;
        }
        let byte = page.as_slice()[PageHeader::SIZE + slot / 8];
        byte & (1 << (slot % 8)) != 0
    }

    fn set_used(&self, page: &mut Page, slot: usize, used: bool) {
        let byte = &mut page.as_mut_slice()[PageHeader::SIZE + slot / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    /// First empty slot, if any.
    pub fn free_slot(&self, page: &Page) -> Option<usize> {
        (0..self.slot_count).find(|&slot| !self.is_used(page, slot))
    }

    /// Number of empty slots.
    pub fn free_slots(&self, page: &Page) -> usize {
        (0..self.slot_count)
            .filter(|&slot| !self.is_used(page, slot))
            .count()
    }

    /// Store `record` in the first empty slot and return the slot number.
    pub fn insert(&self, page: &mut Page, record: &[u8]) -> Result<usize> {
        if record.len() != self.record_size {
            return Err(Error::InvalidRecord(format!(
                "expected {} bytes, got {}",
                self.record_size,
                record.len()
            )));
        }
        self.format(page)?;

        let slot = self.free_slot(page).ok_or(Error::PageFull(page.id()))?;
        let offset = self.slot_offset(slot);
        page.as_mut_slice()[offset..offset + self.record_size].copy_from_slice(record);
        self.set_used(page, slot, true);
        Ok(slot)
    }

    /// Empty `slot`. Fails if it holds no record.
    pub fn delete(&self, page: &mut Page, slot: usize) -> Result<()> {
        if !self.is_used(page, slot) {
            return Err(Error::InvalidRecord(format!(
                "{} slot {} is empty",
                page.id(),
                slot
            )));
        }
        let offset = self.slot_offset(slot);
        page.as_mut_slice()[offset..offset + self.record_size].fill(0);
        self.set_used(page, slot, false);
        Ok(())
    }

    /// The record stored in `slot`.
    pub fn read<'a>(&self, page: &'a Page, slot: usize) -> Option<&'a [u8]> {
        if !self.is_used(page, slot) {
            return None;
        }
        let offset = self.slot_offset(slot);
        Some(&page.as_slice()[offset..offset + self.record_size])
    }

    /// Every stored record with its slot number, in slot order.
    pub fn records<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = (usize, &'a [u8])> + 'a {
        (0..self.slot_count).filter_map(move |slot| self.read(page, slot).map(|r| (slot, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PageId;

    fn blank() -> Page {
        Page::new(PageId::new(0, 0))
    }

    #[test]
    fn test_slot_count_fits_page() {
        for record_size in [1, 8, 100, 1000, HeapPage::MAX_RECORD_SIZE] {
            let layout = HeapPage::new(record_size).unwrap();
            assert!(layout.slot_count() >= 1);
            let end = layout.slot_offset(layout.slot_count());
            assert!(end <= PAGE_SIZE, "record_size {} overflows", record_size);
        }
    }

    #[test]
    fn test_invalid_record_sizes() {
        assert!(HeapPage::new(0).is_err());
        assert!(HeapPage::new(HeapPage::MAX_RECORD_SIZE + 1).is_err());
    }

    #[test]
    fn test_insert_read_delete() {
        let layout = HeapPage::new(4).unwrap();
        let mut page = blank();

        let slot = layout.insert(&mut page, b"abcd").unwrap();
        assert_eq!(slot, 0);
        assert_eq!(layout.read(&page, 0), Some(&b"abcd"[..]));
        assert_eq!(page.header().page_type, PageType::Heap);

        let slot = layout.insert(&mut page, b"efgh").unwrap();
        assert_eq!(slot, 1);

        layout.delete(&mut page, 0).unwrap();
        assert_eq!(layout.read(&page, 0), None);
        assert_eq!(layout.free_slot(&page), Some(0));

        let collected: Vec<_> = layout.records(&page).collect();
        assert_eq!(collected, vec![(1, &b"efgh"[..])]);
    }

    #[test]
    fn test_wrong_record_length_rejected() {
        let layout = HeapPage::new(4).unwrap();
        let mut page = blank();
        assert!(matches!(
            layout.insert(&mut page, b"abc"),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_delete_empty_slot_rejected() {
        let layout = HeapPage::new(4).unwrap();
        let mut page = blank();
        assert!(layout.delete(&mut page, 3).is_err());
    }

    #[test]
    fn test_page_full() {
        let layout = HeapPage::new(HeapPage::MAX_RECORD_SIZE).unwrap();
        let mut page = blank();
        let record = vec![7u8; HeapPage::MAX_RECORD_SIZE];

        for _ in 0..layout.slot_count() {
            layout.insert(&mut page, &record).unwrap();
        }
        assert_eq!(layout.free_slots(&page), 0);
        assert!(matches!(
            layout.insert(&mut page, &record),
            Err(Error::PageFull(_))
        ));
    }

    #[test]
    fn test_record_size_mismatch_on_formatted_page() {
        let mut page = blank();
        HeapPage::new(4).unwrap().format(&mut page).unwrap();
        assert!(HeapPage::new(8).unwrap().format(&mut page).is_err());
    }
}
