//! # RISC-V SATP Register
//!
//! Encoding of the SATP (Supervisor Address Translation and Protection)
//! register value. Writing it goes through the hart seam.
//!
//! ## SATP Layout (RV64)
//!
//! ```text
//! 63    60 59         44 43                            0
//! +-------+-------------+-------------------------------+
//! | MODE  |    ASID     |             PPN               |
//! +-------+-------------+-------------------------------+
//!   4 bits   16 bits              44 bits
//! ```
//!
//! ## Modes
//!
//! - 0: Bare (no translation)
//! - 8: Sv39 (39-bit virtual address, 3-level page table)
//!
//! Sv48 and Sv57 encodings read as reserved here.

use core::fmt;

// ============================================================================
// SATP Mode Definitions
// ============================================================================

/// SATP paging modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SatpMode {
    /// No translation (bare mode)
    #[default]
    Bare = 0,
    /// Sv39: 39-bit virtual address, 3-level page table
    Sv39 = 8,
}

impl SatpMode {
    /// Create from raw value
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Bare),
            8 => Some(Self::Sv39),
            _ => None,
        }
    }

    /// Get the mode name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bare => "Bare",
            Self::Sv39 => "Sv39",
        }
    }
}

// ============================================================================
// SATP Register Representation
// ============================================================================

/// SATP register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Satp {
    bits: u64,
}

impl Satp {
    /// Mode field shift
    pub const MODE_SHIFT: u64 = 60;
    /// Mode field mask
    pub const MODE_MASK: u64 = 0xF << Self::MODE_SHIFT;
    /// ASID field shift
    pub const ASID_SHIFT: u64 = 44;
    /// ASID field mask
    pub const ASID_MASK: u64 = 0xFFFF << Self::ASID_SHIFT;
    /// PPN field mask
    pub const PPN_MASK: u64 = (1 << 44) - 1;

    /// Create from raw value
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Get raw value
    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Create new SATP value from a root table page number
    pub const fn new(mode: SatpMode, asid: u16, root_ppn: u64) -> Self {
        let bits = ((mode as u64) << Self::MODE_SHIFT)
            | ((asid as u64) << Self::ASID_SHIFT)
            | (root_ppn & Self::PPN_MASK);
        Self { bits }
    }

    /// Create SATP for bare mode
    pub const fn bare() -> Self {
        Self { bits: 0 }
    }

    /// Create SATP for Sv39 from the root table's physical address
    pub const fn sv39(asid: u16, root_table_addr: u64) -> Self {
        Self::new(SatpMode::Sv39, asid, root_table_addr >> 12)
    }

    /// Get the mode
    ///
    /// Reserved encodings read as `None`.
    pub const fn mode(self) -> Option<SatpMode> {
        SatpMode::from_u8(((self.bits & Self::MODE_MASK) >> Self::MODE_SHIFT) as u8)
    }

    /// Get the ASID
    pub const fn asid(self) -> u16 {
        ((self.bits & Self::ASID_MASK) >> Self::ASID_SHIFT) as u16
    }

    /// Get the root table PPN
    pub const fn ppn(self) -> u64 {
        self.bits & Self::PPN_MASK
    }

    /// Get the root table physical address
    pub const fn root_table_addr(self) -> u64 {
        self.ppn() << 12
    }
}

impl fmt::Display for Satp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode() {
            Some(mode) => mode.name(),
            None => "reserved",
        };
        write!(f, "{} asid={} root={:#x}", mode, self.asid(), self.root_table_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sv39_encoding() {
        let satp = Satp::sv39(0, 0x8020_1000);
        assert_eq!(satp.bits() >> 60, 8);
        assert_eq!(satp.mode(), Some(SatpMode::Sv39));
        assert_eq!(satp.asid(), 0);
        assert_eq!(satp.ppn(), 0x8_0201);
        assert_eq!(satp.root_table_addr(), 0x8020_1000);
    }

    #[test]
    fn test_fields_do_not_overlap() {
        let satp = Satp::new(SatpMode::Sv39, 0xFFFF, u64::MAX);
        assert_eq!(satp.asid(), 0xFFFF);
        assert_eq!(satp.ppn(), Satp::PPN_MASK);
        assert_eq!(satp.mode(), Some(SatpMode::Sv39));
    }

    #[test]
    fn test_bare_and_reserved() {
        assert_eq!(Satp::bare().mode(), Some(SatpMode::Bare));
        assert_eq!(Satp::from_bits(3 << 60).mode(), None);
        assert_eq!(Satp::from_bits(9 << 60).mode(), None);
    }

    #[test]
    fn test_display() {
        let text = Satp::sv39(0, 0x8020_0000).to_string();
        assert_eq!(text, "Sv39 asid=0 root=0x80200000");
    }
}
