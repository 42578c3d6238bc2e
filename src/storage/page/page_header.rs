//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing metadata:
//! - [`PageType`] discriminator
//! - CRC32 checksum for integrity
//! - Record size of the slots stored in the page

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Never written: an all-zero page fresh from allocation.
    #[default]
    Blank = 0,
    /// Heap page holding fixed-size record slots.
    Heap = 1,
}

impl PageType {
    /// Convert from u8. Unknown values are `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PageType::Blank),
            1 => Some(PageType::Heap),
            _ => None,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       2     record_size (little-endian)
/// 7       1     reserved
/// ```
///
/// # Checksum
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. A blank page carries no checksum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Size in bytes of every record slot in the page.
    pub record_size: u16,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Offset of each field within the header.
    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_RECORD_SIZE: usize = 5;

    /// Create a new heap header for slots of `record_size` bytes.
    pub fn heap(record_size: u16) -> Self {
        Self {
            page_type: PageType::Heap,
            checksum: 0,
            record_size,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// An unknown page type byte is read as [`PageType::Blank`]. Such a page
    /// is not all zero, so [`verify_checksum`](Self::verify_checksum) still
    /// rejects it unless its checksum matches.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let page_type = PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]).unwrap_or_default();

        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        let record_size = u16::from_le_bytes([
            data[Self::OFFSET_RECORD_SIZE],
            data[Self::OFFSET_RECORD_SIZE + 1],
        ]);

        Self {
            page_type,
            checksum,
            record_size,
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_RECORD_SIZE..Self::OFFSET_RECORD_SIZE + 2]
            .copy_from_slice(&self.record_size.to_le_bytes());
    }

    /// Compute CRC32 checksum of a page.
    ///
    /// The checksum is computed with the checksum field (bytes 1-4) zeroed out,
    /// so the checksum doesn't include itself.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();

        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);

        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    ///
    /// An all-zero page, fresh from allocation, carries no checksum and
    /// always verifies. The type byte is not trusted for this.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        page_data.iter().all(|&b| b == 0) || self.checksum == Self::compute_checksum(page_data)
    }
}
