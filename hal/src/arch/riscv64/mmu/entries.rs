//! # RISC-V Page Table Entries
//!
//! This module defines the Sv39 page table entry format.
//!
//! ## PTE Format
//!
//! ```text
//! 63    54 53    28 27    19 18    10 9  8 7 6 5 4 3 2 1 0
//! +-------+--------+--------+--------+----+-+-+-+-+-+-+-+-+
//! |Reserved| PPN[2] | PPN[1] | PPN[0] |RSW |D|A|G|U|X|W|R|V|
//! +-------+--------+--------+--------+----+-+-+-+-+-+-+-+-+
//!  10 bits  26 bits   9 bits   9 bits  2b  1 1 1 1 1 1 1 1
//! ```
//!
//! ## Permission Encoding
//!
//! | R | W | X | Meaning                          |
//! |---|---|---|----------------------------------|
//! | 0 | 0 | 0 | Pointer to next level            |
//! | 0 | 1 | 0 | Reserved (invalid)               |
//! | 1 | 1 | 1 | Read-Write-Execute page          |
//! | * | * | * | Any other combination: leaf      |

use core::fmt;

// ============================================================================
// Page Table Entry
// ============================================================================

/// Page table entry (64-bit)
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageTableEntry(u64);

impl PageTableEntry {
    /// Valid bit
    pub const V_BIT: u64 = 1 << 0;
    /// Read permission
    pub const R_BIT: u64 = 1 << 1;
    /// Write permission
    pub const W_BIT: u64 = 1 << 2;
    /// Execute permission
    pub const X_BIT: u64 = 1 << 3;
    /// User mode accessible
    pub const U_BIT: u64 = 1 << 4;
    /// Global mapping
    pub const G_BIT: u64 = 1 << 5;
    /// Accessed
    pub const A_BIT: u64 = 1 << 6;
    /// Dirty
    pub const D_BIT: u64 = 1 << 7;

    /// Full PPN shift
    pub const PPN_SHIFT: u64 = 10;
    /// PPN width in bits
    pub const PPN_BITS: u64 = 44;
    /// Full PPN mask (44 bits, in place)
    pub const PPN_MASK: u64 = ((1u64 << Self::PPN_BITS) - 1) << Self::PPN_SHIFT;

    /// RWX permission mask
    pub const RWX_MASK: u64 = Self::R_BIT | Self::W_BIT | Self::X_BIT;

    /// All flags mask (bits 0-9)
    pub const FLAGS_MASK: u64 = (1 << 10) - 1;

    /// Create an invalid (zero) entry
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create from raw bits
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Create a leaf entry for physical page `ppn`
    ///
    /// The valid bit is always set.
    pub const fn new_leaf(ppn: u64, flags: PageFlags) -> Self {
        let ppn = ppn & ((1 << Self::PPN_BITS) - 1);
        Self((ppn << Self::PPN_SHIFT) | flags.bits() as u64 | Self::V_BIT)
    }

    /// Create a pointer to the next-level table at physical page `ppn`
    pub const fn new_table(ppn: u64) -> Self {
        let ppn = ppn & ((1 << Self::PPN_BITS) - 1);
        Self((ppn << Self::PPN_SHIFT) | Self::V_BIT)
    }

    /// Check if entry is valid
    pub const fn is_valid(self) -> bool {
        self.0 & Self::V_BIT != 0
    }

    /// Check if entry is a leaf (has R, W, or X set)
    pub const fn is_leaf(self) -> bool {
        self.0 & Self::RWX_MASK != 0
    }

    /// Check if entry is a pointer to next level
    pub const fn is_pointer(self) -> bool {
        self.is_valid() && !self.is_leaf()
    }

    /// Get the physical page number
    pub const fn ppn(self) -> u64 {
        (self.0 & Self::PPN_MASK) >> Self::PPN_SHIFT
    }

    /// Get the physical address (PPN << 12)
    pub const fn phys_addr(self) -> u64 {
        self.ppn() << 12
    }

    /// Get the flags
    pub const fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate((self.0 & Self::FLAGS_MASK) as u16)
    }
}

impl Default for PageTableEntry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("valid", &self.is_valid())
            .field("leaf", &self.is_leaf())
            .field("ppn", &format_args!("{:#x}", self.ppn()))
            .field("flags", &self.flags())
            .finish()
    }
}

// ============================================================================
// Page Flags
// ============================================================================

bitflags::bitflags! {
    /// Page table entry flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u16 {
        /// Valid
        const VALID = 1 << 0;
        /// Readable
        const READ = 1 << 1;
        /// Writable
        const WRITE = 1 << 2;
        /// Executable
        const EXEC = 1 << 3;
        /// User accessible
        const USER = 1 << 4;
        /// Global mapping
        const GLOBAL = 1 << 5;
        /// Accessed
        const ACCESSED = 1 << 6;
        /// Dirty
        const DIRTY = 1 << 7;
        /// Reserved for software 0
        const RSW0 = 1 << 8;
        /// Reserved for software 1
        const RSW1 = 1 << 9;
    }
}

impl PageFlags {
    /// Read-write-execute page
    pub const RWX: Self = Self::READ.union(Self::WRITE).union(Self::EXEC);

    /// Supervisor identity page: RWX with A and D preset
    ///
    /// Presetting A/D keeps hardware that does not update them from faulting.
    pub const IDENTITY: Self = Self::VALID
        .union(Self::RWX)
        .union(Self::ACCESSED)
        .union(Self::DIRTY);

    /// Check if flags represent a leaf entry
    pub const fn is_leaf(self) -> bool {
        self.intersects(Self::RWX)
    }
}

impl Default for PageFlags {
    fn default() -> Self {
        Self::empty()
    }
}
