//! # Boot Information
//!
//! What the firmware hands the kernel: the hart id in `a0` and the physical
//! address of the configuration blob (a flattened device tree) in `a1`.
//!
//! ## Configuration Blob Header
//!
//! All fields are 32-bit big-endian:
//!
//! ```text
//! offset  field
//! 0x00    magic                 0xd00dfeed
//! 0x04    total_size
//! 0x08    struct_offset
//! 0x0c    strings_offset
//! 0x10    mem_rsvmap_offset
//! 0x14    version
//! 0x18    last_compatible_version
//! 0x1c    boot_cpuid
//! 0x20    strings_size
//! ```

use static_assertions::const_assert_eq;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Number of harts the kernel accepts ids for
pub const MAX_HARTS: u64 = 16;

/// Configuration blob magic
pub const CONFIG_BLOB_MAGIC: u32 = 0xd00d_feed;

/// Largest accepted configuration blob
pub const CONFIG_BLOB_MAX_SIZE: u32 = 1 << 20;

/// Required configuration blob alignment
pub const CONFIG_BLOB_ALIGN: u64 = 4;

// =============================================================================
// HART BOOT INFO
// =============================================================================

/// Firmware hand-off registers, captured once at entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HartBootInfo {
    hart_id: u64,
    config_blob_address: u64,
}

impl HartBootInfo {
    /// Capture `a0` and `a1`
    pub const fn new(hart_id: u64, config_blob_address: u64) -> Self {
        Self {
            hart_id,
            config_blob_address,
        }
    }

    /// Hart id from `a0`
    pub const fn hart_id(&self) -> u64 {
        self.hart_id
    }

    /// Configuration blob address from `a1`
    pub const fn config_blob_address(&self) -> u64 {
        self.config_blob_address
    }
}

// =============================================================================
// CONFIGURATION BLOB HEADER
// =============================================================================

/// Decoded configuration blob header, host byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigBlobHeader {
    /// Magic value
    pub magic: u32,
    /// Size of the whole blob in bytes
    pub total_size: u32,
    /// Offset of the structure block
    pub struct_offset: u32,
    /// Offset of the strings block
    pub strings_offset: u32,
    /// Offset of the memory reservation map
    pub mem_rsvmap_offset: u32,
    /// Format version
    pub version: u32,
    /// Oldest compatible format version
    pub last_compatible_version: u32,
    /// Physical id of the boot CPU
    pub boot_cpuid: u32,
    /// Size of the strings block
    pub strings_size: u32,
}

impl ConfigBlobHeader {
    /// Number of 32-bit fields
    pub const FIELDS: usize = 9;
    /// Encoded size in bytes
    pub const SIZE: usize = Self::FIELDS * 4;

    /// Decode from big-endian bytes
    pub fn from_be_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let mut words = [0u32; Self::FIELDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Self {
            magic: words[0],
            total_size: words[1],
            struct_offset: words[2],
            strings_offset: words[3],
            mem_rsvmap_offset: words[4],
            version: words[5],
            last_compatible_version: words[6],
            boot_cpuid: words[7],
            strings_size: words[8],
        }
    }

    /// Decode the header at the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header: &[u8; Self::SIZE] = bytes.get(..Self::SIZE)?.try_into().ok()?;
        Some(Self::from_be_bytes(header))
    }

    /// Encode to big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; Self::SIZE] {
        let words = [
            self.magic,
            self.total_size,
            self.struct_offset,
            self.strings_offset,
            self.mem_rsvmap_offset,
            self.version,
            self.last_compatible_version,
            self.boot_cpuid,
            self.strings_size,
        ];

        let mut bytes = [0u8; Self::SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// Check the magic value
    pub const fn has_valid_magic(&self) -> bool {
        self.magic == CONFIG_BLOB_MAGIC
    }
}

const_assert_eq!(ConfigBlobHeader::SIZE, 36);

// =============================================================================
// BLOB ACCESS
// =============================================================================

/// Source of configuration blob headers
pub trait BlobReader {
    /// Read the raw header at a physical address
    ///
    /// `None` means the address is outside what this reader can see.
    fn read_header(&self, address: u64) -> Option<[u8; ConfigBlobHeader::SIZE]>;
}

/// Reads physical memory directly (identity addressing, paging off)
#[derive(Debug)]
pub struct DirectMemory {
    _private: (),
}

impl DirectMemory {
    /// Create a direct reader
    ///
    /// # Safety
    ///
    /// Every address later passed to [`BlobReader::read_header`] that is
    /// non-null and 4-byte aligned must be readable for
    /// [`ConfigBlobHeader::SIZE`] bytes. Firmware guarantees this for the
    /// address it passes in `a1`.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl BlobReader for DirectMemory {
    fn read_header(&self, address: u64) -> Option<[u8; ConfigBlobHeader::SIZE]> {
        if address == 0 {
            return None;
        }
        let ptr = address as usize as *const [u8; ConfigBlobHeader::SIZE];
        // SAFETY: guaranteed readable by the contract of `DirectMemory::new`.
        Some(unsafe { core::ptr::read_volatile(ptr) })
    }
}

/// A byte buffer mapped at a chosen physical base address
#[derive(Debug, Clone, Copy)]
pub struct BlobWindow<'a> {
    base: u64,
    bytes: &'a [u8],
}

impl<'a> BlobWindow<'a> {
    /// Expose `bytes` at `base`
    pub const fn new(base: u64, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    /// Base address
    pub const fn base(&self) -> u64 {
        self.base
    }
}

impl BlobReader for BlobWindow<'_> {
    fn read_header(&self, address: u64) -> Option<[u8; ConfigBlobHeader::SIZE]> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(ConfigBlobHeader::SIZE)?;
        self.bytes.get(start..end)?.try_into().ok()
    }
}
