//! # Early Address Space
//!
//! Builds the boot identity map: every 4 KiB page of `[0, 4 GiB)` maps to
//! itself, readable, writable and executable, with A and D preset.
//!
//! ## Table Arena
//!
//! Tables come from a fixed [`PageTableArena`] addressed by
//! `(level, slot)`. The layout is static, so the builder never allocates:
//!
//! ```text
//! root            1 table      slot 0
//! directories     4 tables     slot = VPN[2]
//! leaves       2048 tables     slot = VPN[2] * 512 + VPN[1]
//! ```
//!
//! Only the arena knows physical addresses. The finished map is handed out
//! as a read-only [`IdentityMap`].

use core::fmt;

use sable_hal::arch::riscv64::mmu::{
    vpn, PageFlags, PageTable, PageTableEntry, Satp, ENTRIES_PER_TABLE, GIGAPAGE_SIZE, PAGE_SHIFT,
    PAGE_SIZE,
};
use sable_hal::{Csr, Hart};
use static_assertions::{const_assert, const_assert_eq};

// =============================================================================
// LAYOUT
// =============================================================================

/// End of the identity-mapped range (exclusive)
pub const IDENTITY_MAP_LIMIT: u64 = 4 << 30;

/// Root entries in use
pub const ROOT_SLOTS: usize = (IDENTITY_MAP_LIMIT / GIGAPAGE_SIZE) as usize;

/// Level 1 tables
pub const DIRECTORY_TABLES: usize = ROOT_SLOTS;

/// Level 0 tables
pub const LEAF_TABLES: usize = ROOT_SLOTS * ENTRIES_PER_TABLE;

/// Tables in the arena
pub const ARENA_TABLES: usize = 1 + DIRECTORY_TABLES + LEAF_TABLES;

/// Pages mapped by the identity map
pub const IDENTITY_PAGES: u64 = IDENTITY_MAP_LIMIT / PAGE_SIZE;

const_assert!(IDENTITY_MAP_LIMIT % GIGAPAGE_SIZE == 0);
// Must stay in the lower canonical half of Sv39
const_assert!(ROOT_SLOTS <= ENTRIES_PER_TABLE / 2);
const_assert_eq!(core::mem::size_of::<PageTableArena>(), ARENA_TABLES * PAGE_SIZE as usize);

/// Translation level of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableLevel {
    /// Level 2, indexed by VPN[2]
    Root,
    /// Level 1, indexed by VPN[1]
    Directory,
    /// Level 0, indexed by VPN[0]
    Leaf,
}

impl TableLevel {
    /// VPN field this level is indexed by
    pub const fn vpn_level(self) -> usize {
        match self {
            Self::Root => 2,
            Self::Directory => 1,
            Self::Leaf => 0,
        }
    }

    /// Tables of this level in the arena
    pub const fn capacity(self) -> usize {
        match self {
            Self::Root => 1,
            Self::Directory => DIRECTORY_TABLES,
            Self::Leaf => LEAF_TABLES,
        }
    }

    /// Level below this one
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Root => Some(Self::Directory),
            Self::Directory => Some(Self::Leaf),
            Self::Leaf => None,
        }
    }

    /// Bytes covered by one entry at this level
    pub const fn entry_span(self) -> u64 {
        1 << (PAGE_SHIFT + 9 * self.vpn_level() as u64)
    }

    /// Get level name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Directory => "directory",
            Self::Leaf => "leaf",
        }
    }
}

/// Arena coordinates of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSlot {
    /// Table level
    pub level: TableLevel,
    /// Index within the level
    pub index: usize,
}

impl TableSlot {
    /// The root table
    pub const ROOT: Self = Self {
        level: TableLevel::Root,
        index: 0,
    };

    /// Directory table for root entry `vpn2`
    pub const fn directory(vpn2: usize) -> Self {
        Self {
            level: TableLevel::Directory,
            index: vpn2,
        }
    }

    /// Leaf table for directory entry `vpn1` under root entry `vpn2`
    pub const fn leaf(vpn2: usize, vpn1: usize) -> Self {
        Self {
            level: TableLevel::Leaf,
            index: vpn2 * ENTRIES_PER_TABLE + vpn1,
        }
    }

    /// Check the slot exists in the arena
    pub const fn is_in_range(self) -> bool {
        self.index < self.level.capacity()
    }
}

// =============================================================================
// ARENA
// =============================================================================

/// Statically sized backing store for every boot page table
#[repr(C, align(4096))]
pub struct PageTableArena {
    root: PageTable,
    directories: [PageTable; DIRECTORY_TABLES],
    leaves: [PageTable; LEAF_TABLES],
}

impl PageTableArena {
    const EMPTY: PageTable = PageTable::new();

    /// An arena of all-invalid tables
    ///
    /// All-zero bytes are also a valid arena, so a zeroed `.bss` placement
    /// needs no initialisation.
    pub const fn new() -> Self {
        Self {
            root: Self::EMPTY,
            directories: [Self::EMPTY; DIRECTORY_TABLES],
            leaves: [Self::EMPTY; LEAF_TABLES],
        }
    }

    /// Look up a table
    pub fn table(&self, slot: TableSlot) -> Option<&PageTable> {
        match slot.level {
            TableLevel::Root if slot.index == 0 => Some(&self.root),
            TableLevel::Root => None,
            TableLevel::Directory => self.directories.get(slot.index),
            TableLevel::Leaf => self.leaves.get(slot.index),
        }
    }

    fn table_mut(&mut self, slot: TableSlot) -> Option<&mut PageTable> {
        match slot.level {
            TableLevel::Root if slot.index == 0 => Some(&mut self.root),
            TableLevel::Root => None,
            TableLevel::Directory => self.directories.get_mut(slot.index),
            TableLevel::Leaf => self.leaves.get_mut(slot.index),
        }
    }

    /// Physical address of a table
    ///
    /// Boot runs with translation off, so addresses are physical.
    pub fn table_address(&self, slot: TableSlot) -> Option<u64> {
        self.table(slot).map(|table| table as *const PageTable as usize as u64)
    }

    /// Physical page number of a table
    pub fn table_ppn(&self, slot: TableSlot) -> Option<u64> {
        self.table_address(slot).map(|addr| addr >> PAGE_SHIFT)
    }

    /// Find the table at `ppn` among tables of `level`
    pub fn slot_for_ppn(&self, level: TableLevel, ppn: u64) -> Option<TableSlot> {
        let first = self.table_ppn(TableSlot { level, index: 0 })?;
        let index = usize::try_from(ppn.checked_sub(first)?).ok()?;
        let slot = TableSlot { level, index };
        slot.is_in_range().then_some(slot)
    }

    /// Invalidate every entry of every table
    pub fn clear(&mut self) {
        self.root.clear();
        self.directories.iter_mut().for_each(PageTable::clear);
        self.leaves.iter_mut().for_each(PageTable::clear);
    }

    /// Point `parent[index]` at `child` unless it is already valid
    fn link(&mut self, parent: TableSlot, index: usize, child: TableSlot) {
        let Some(child_ppn) = self.table_ppn(child) else {
            return;
        };
        if let Some(table) = self.table_mut(parent) {
            if !table.entry(index).is_valid() {
                table.set_entry(index, PageTableEntry::new_table(child_ppn));
            }
        }
    }
}

impl Default for PageTableArena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PageTableArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableArena")
            .field("root", &self.table_address(TableSlot::ROOT))
            .field("tables", &ARENA_TABLES)
            .field("root_entries", &self.root.valid_count())
            .finish()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Writes the identity map into an arena
#[derive(Debug)]
pub struct AddressSpaceBuilder<'a> {
    arena: &'a mut PageTableArena,
}

impl<'a> AddressSpaceBuilder<'a> {
    /// Take exclusive use of `arena`
    pub fn new(arena: &'a mut PageTableArena) -> Self {
        Self { arena }
    }

    /// Map `[0, IDENTITY_MAP_LIMIT)` onto itself in 4 KiB pages
    ///
    /// Any previous content of the arena is discarded.
    pub fn build_identity_map(self) -> IdentityMap<'a> {
        let arena = self.arena;
        arena.clear();

        let mut va = 0;
        while va < IDENTITY_MAP_LIMIT {
            let (vpn2, vpn1, vpn0) = (vpn(va, 2), vpn(va, 1), vpn(va, 0));
            let directory = TableSlot::directory(vpn2);
            let leaf = TableSlot::leaf(vpn2, vpn1);

            arena.link(TableSlot::ROOT, vpn2, directory);
            arena.link(directory, vpn1, leaf);
            if let Some(table) = arena.table_mut(leaf) {
                table.set_entry(vpn0, PageTableEntry::new_leaf(va >> PAGE_SHIFT, PageFlags::IDENTITY));
            }

            va += PAGE_SIZE;
        }

        log::debug!(
            "identity map: {} pages below {:#x} in {} tables",
            IDENTITY_PAGES,
            IDENTITY_MAP_LIMIT,
            ARENA_TABLES
        );

        IdentityMap { arena }
    }
}

// =============================================================================
// IDENTITY MAP
// =============================================================================

/// Page walk failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkError {
    /// Address is not sign-extended from bit 38
    NonCanonical,
    /// Entry not valid at the given level
    NotMapped {
        /// Level of the invalid entry
        level: TableLevel,
    },
    /// Pointer entry names a page outside the arena
    DanglingTable {
        /// Level holding the pointer
        level: TableLevel,
    },
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonCanonical => write!(f, "address is not canonical"),
            Self::NotMapped { level } => write!(f, "entry not valid at {} level", level.name()),
            Self::DanglingTable { level } => {
                write!(f, "{} entry points outside the table arena", level.name())
            },
        }
    }
}

/// Result of a successful walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// Leaf entry
    pub entry: PageTableEntry,
    /// Level the leaf was found at
    pub level: TableLevel,
}

impl Translation {
    /// Physical address for `va` under this leaf
    pub const fn physical_address(&self, va: u64) -> u64 {
        let span = self.level.entry_span();
        self.entry.phys_addr() + (va & (span - 1))
    }
}

/// Read-only handle to a finished identity map
#[derive(Debug)]
pub struct IdentityMap<'a> {
    arena: &'a PageTableArena,
}

impl IdentityMap<'_> {
    /// Mapped range end (exclusive)
    pub const fn limit(&self) -> u64 {
        IDENTITY_MAP_LIMIT
    }

    /// Physical address of the root table
    pub fn root_address(&self) -> u64 {
        self.arena.table_address(TableSlot::ROOT).unwrap_or_default()
    }

    /// Physical page number of the root table
    pub fn root_ppn(&self) -> u64 {
        self.root_address() >> PAGE_SHIFT
    }

    /// SATP value selecting this map (Sv39, ASID 0)
    pub fn satp(&self) -> Satp {
        Satp::sv39(0, self.root_address())
    }

    /// Root table entry
    pub fn root_entry(&self, index: usize) -> PageTableEntry {
        self.arena.root.entry(index)
    }

    /// Walk the tables for `va`
    pub fn walk(&self, va: u64) -> Result<Translation, WalkError> {
        let upper = va >> 38;
        if upper != 0 && upper != (1 << 26) - 1 {
            return Err(WalkError::NonCanonical);
        }

        let mut slot = TableSlot::ROOT;
        loop {
            let level = slot.level;
            let table = self.arena.table(slot).ok_or(WalkError::DanglingTable { level })?;
            let entry = table.entry(vpn(va, level.vpn_level()));

            if !entry.is_valid() {
                return Err(WalkError::NotMapped { level });
            }
            if entry.is_leaf() {
                return Ok(Translation { entry, level });
            }

            // A pointer at the last level is malformed
            let next = level.next().ok_or(WalkError::DanglingTable { level })?;
            slot = self
                .arena
                .slot_for_ppn(next, entry.ppn())
                .ok_or(WalkError::DanglingTable { level })?;
        }
    }

    /// Translate `va` to a physical address
    pub fn translate(&self, va: u64) -> Option<u64> {
        self.walk(va).ok().map(|translation| translation.physical_address(va))
    }

    /// Switch the hart onto this map
    ///
    /// Full translation fence, `satp` write, full translation fence.
    pub fn activate<H: Hart + ?Sized>(&self, hart: &mut H) -> Satp {
        let satp = self.satp();
        hart.sfence_vma();
        hart.write_csr(Csr::Satp, satp.bits());
        hart.sfence_vma();
        log::info!("paging enabled: {}", satp);
        satp
    }
}

#[cfg(test)]
mod tests {
    use std::alloc::{alloc_zeroed, Layout};

    use sable_hal::arch::riscv64::mmu::SatpMode;
    use sable_hal::mock::{HartEvent, MockHart};

    use super::*;

    /// Heap arena; too large for a test thread's stack.
    fn arena() -> Box<PageTableArena> {
        let layout = Layout::new::<PageTableArena>();
        // SAFETY: all-zero bytes are a valid arena; layout is non-zero sized.
        unsafe { Box::from_raw(alloc_zeroed(layout).cast::<PageTableArena>()) }
    }

    #[test]
    fn test_every_page_is_identity_mapped() {
        let mut arena = arena();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();

        let mut va = 0;
        while va < IDENTITY_MAP_LIMIT {
            let translation = map.walk(va).unwrap();
            assert_eq!(translation.level, TableLevel::Leaf, "va {:#x}", va);
            assert_eq!(translation.entry.ppn(), va >> 12, "va {:#x}", va);
            assert_eq!(translation.entry.flags(), PageFlags::IDENTITY, "va {:#x}", va);
            va += PAGE_SIZE;
        }
    }

    #[test]
    fn test_translate_keeps_offset() {
        let mut arena = arena();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();

        assert_eq!(map.translate(0x8020_0123), Some(0x8020_0123));
        assert_eq!(map.translate(IDENTITY_MAP_LIMIT - 1), Some(IDENTITY_MAP_LIMIT - 1));
        assert_eq!(map.translate(IDENTITY_MAP_LIMIT), None);
    }

    #[test]
    fn test_nothing_mapped_above_limit() {
        let mut arena = arena();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();

        for index in 0..ENTRIES_PER_TABLE {
            assert_eq!(map.root_entry(index).is_valid(), index < ROOT_SLOTS, "root entry {}", index);
        }
        assert_eq!(
            map.walk(IDENTITY_MAP_LIMIT),
            Err(WalkError::NotMapped {
                level: TableLevel::Root
            })
        );
        assert_eq!(map.walk(1 << 40), Err(WalkError::NonCanonical));
    }

    #[test]
    fn test_intermediate_entries_are_pointers() {
        let mut arena = arena();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();

        for index in 0..ROOT_SLOTS {
            let entry = map.root_entry(index);
            assert!(entry.is_pointer());
            assert_eq!(entry.flags(), PageFlags::VALID);
        }
    }

    #[test]
    fn test_rebuild_discards_stale_entries() {
        let mut arena = arena();
        if let Some(root) = arena.table_mut(TableSlot::ROOT) {
            root.set_entry(300, PageTableEntry::new_leaf(1, PageFlags::IDENTITY));
        }

        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();
        assert!(!map.root_entry(300).is_valid());
    }

    #[test]
    fn test_satp_names_root() {
        let mut arena = arena();
        let root = arena.table_ppn(TableSlot::ROOT).unwrap();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();

        let satp = map.satp();
        assert_eq!(satp.mode(), Some(SatpMode::Sv39));
        assert_eq!(satp.asid(), 0);
        assert_eq!(satp.ppn(), root);
        assert_eq!(map.root_ppn(), root);
    }

    #[test]
    fn test_activate_fences_around_satp_write() {
        let mut arena = arena();
        let map = AddressSpaceBuilder::new(&mut arena).build_identity_map();
        let mut hart = MockHart::new();

        let satp = map.activate(&mut hart);
        assert_eq!(
            hart.events(),
            &[
                HartEvent::SfenceVma,
                HartEvent::CsrWrite {
                    csr: Csr::Satp,
                    value: satp.bits()
                },
                HartEvent::SfenceVma,
            ]
        );
    }

    #[test]
    fn test_arena_slot_lookup() {
        let arena = arena();
        let slot = TableSlot::leaf(2, 7);
        let ppn = arena.table_ppn(slot).unwrap();
        assert_eq!(arena.slot_for_ppn(TableLevel::Leaf, ppn), Some(slot));
        assert_eq!(arena.slot_for_ppn(TableLevel::Directory, ppn), None);
        assert!(arena.table(TableSlot::leaf(4, 0)).is_none());
    }

    #[test]
    fn test_level_spans() {
        assert_eq!(TableLevel::Leaf.entry_span(), 4096);
        assert_eq!(TableLevel::Directory.entry_span(), 2 << 20);
        assert_eq!(TableLevel::Root.entry_span(), GIGAPAGE_SIZE);
    }
}
