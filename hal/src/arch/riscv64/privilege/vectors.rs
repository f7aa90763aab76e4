//! # RISC-V Trap Vector
//!
//! Encoding of the `stvec` register.
//!
//! ## Vector Modes
//!
//! RISC-V supports two trap vector modes controlled by stvec:
//!
//! - **Direct Mode** (mode=0): All traps jump to the same address (BASE)
//! - **Vectored Mode** (mode=1): Async interrupts jump to BASE + 4*cause

use crate::arch::riscv64::core::csr::tvec;

/// Trap vector mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapVectorMode {
    /// Direct mode - all traps go to BASE
    Direct = 0,
    /// Vectored mode - interrupts go to BASE + 4*cause
    Vectored = 1,
}

impl TrapVectorMode {
    /// Decode the low bits of stvec
    pub const fn from_bits(value: u64) -> Self {
        match value & tvec::MODE_MASK {
            tvec::MODE_VECTORED => Self::Vectored,
            _ => Self::Direct,
        }
    }
}

/// Trap vector configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapVector {
    /// Base address of trap handler
    pub base: u64,
    /// Vector mode
    pub mode: TrapVectorMode,
}

impl TrapVector {
    /// Create a trap vector in direct mode
    ///
    /// Returns `None` unless `handler` is 4-byte aligned.
    pub const fn direct(handler: u64) -> Option<Self> {
        if !Self::is_aligned(handler) {
            return None;
        }
        Some(Self {
            base: handler,
            mode: TrapVectorMode::Direct,
        })
    }

    /// Check the base alignment stvec requires
    pub const fn is_aligned(addr: u64) -> bool {
        addr & tvec::MODE_MASK == 0
    }

    /// Convert to stvec register value
    pub const fn to_stvec(&self) -> u64 {
        (self.base & tvec::BASE_MASK) | (self.mode as u64)
    }

    /// Parse from stvec register value
    pub const fn from_stvec(stvec: u64) -> Self {
        Self {
            base: stvec & tvec::BASE_MASK,
            mode: TrapVectorMode::from_bits(stvec),
        }
    }
}
