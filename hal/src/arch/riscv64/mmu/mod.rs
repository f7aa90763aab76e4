//! # RISC-V Sv39 Memory Management
//!
//! Hardware formats for Sv39 translation: entries, tables, SATP values and
//! virtual-address decomposition.
//!
//! ## Sv39 Virtual Address
//!
//! ```text
//! 38        30 29        21 20        12 11           0
//! +-----------+------------+------------+--------------+
//! |  VPN[2]   |   VPN[1]   |   VPN[0]   |  page offset |
//! +-----------+------------+------------+--------------+
//!    9 bits      9 bits       9 bits        12 bits
//! ```

pub mod entries;
pub mod satp;

pub use entries::{PageFlags, PageTableEntry};
pub use satp::{Satp, SatpMode};

use core::fmt;

use static_assertions::const_assert_eq;

// ============================================================================
// Constants
// ============================================================================

/// Page size (4 KiB)
pub const PAGE_SIZE: u64 = 4096;
/// Page shift
pub const PAGE_SHIFT: u64 = 12;
/// Entries per page table
pub const ENTRIES_PER_TABLE: usize = 512;
/// Index mask for one VPN field
pub const VPN_MASK: u64 = 0x1ff;
/// Bytes covered by one root (level 2) entry
pub const GIGAPAGE_SIZE: u64 = 1 << 30;
/// Bytes covered by one level 1 entry
pub const MEGAPAGE_SIZE: u64 = 1 << 21;
/// Number of translation levels
pub const SV39_LEVELS: usize = 3;

/// Extract the VPN field for `level` (2 = root, 0 = leaf table)
#[inline]
pub const fn vpn(va: u64, level: usize) -> usize {
    ((va >> (PAGE_SHIFT + 9 * level as u64)) & VPN_MASK) as usize
}

/// Physical page number of an address
#[inline]
pub const fn page_number(addr: u64) -> u64 {
    addr >> PAGE_SHIFT
}

// ============================================================================
// Page Table
// ============================================================================

/// One 4 KiB, page-aligned table of 512 entries
#[derive(Clone)]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; ENTRIES_PER_TABLE],
}

const_assert_eq!(core::mem::size_of::<PageTable>(), PAGE_SIZE as usize);
const_assert_eq!(core::mem::align_of::<PageTable>(), PAGE_SIZE as usize);
const_assert_eq!(core::mem::size_of::<PageTableEntry>(), 8);

impl PageTable {
    /// An all-invalid table
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry::empty(); ENTRIES_PER_TABLE],
        }
    }

    /// Read an entry
    #[inline]
    pub fn entry(&self, index: usize) -> PageTableEntry {
        self.entries[index]
    }

    /// Overwrite an entry
    #[inline]
    pub fn set_entry(&mut self, index: usize, entry: PageTableEntry) {
        self.entries[index] = entry;
    }

    /// Invalidate every entry
    pub fn clear(&mut self) {
        self.entries.fill(PageTableEntry::empty());
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = &PageTableEntry> {
        self.entries.iter()
    }

    /// Number of valid entries
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_valid()).count()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Lists only the valid entries, keyed by index
impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.is_valid()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vpn_fields() {
        let va = (3 << 30) | (0x1a5 << 21) | (0x0f0 << 12) | 0x123;
        assert_eq!(vpn(va, 2), 3);
        assert_eq!(vpn(va, 1), 0x1a5);
        assert_eq!(vpn(va, 0), 0x0f0);
    }

    #[test]
    fn test_vpn_last_identity_page() {
        let va = (4u64 << 30) - PAGE_SIZE;
        assert_eq!(vpn(va, 2), 3);
        assert_eq!(vpn(va, 1), 511);
        assert_eq!(vpn(va, 0), 511);
    }

    #[test]
    fn test_table_set_and_clear() {
        let mut table = PageTable::new();
        table.set_entry(7, PageTableEntry::new_table(1));
        assert_eq!(table.valid_count(), 1);
        assert!(table.entry(7).is_pointer());

        table.clear();
        assert_eq!(table.valid_count(), 0);
    }

    #[test]
    fn test_table_debug_skips_invalid_entries() {
        let mut table = PageTable::new();
        assert_eq!(format!("{:?}", table), "{}");

        table.set_entry(3, PageTableEntry::new_table(1));
        let text = format!("{:?}", table);
        assert!(text.starts_with("{3: PageTableEntry {"));
        assert_eq!(text.matches("PageTableEntry").count(), 1);
    }
}
