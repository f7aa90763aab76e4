//! # RISC-V Trap Context
//!
//! The three CSRs describing a supervisor trap, captured at entry.
//!
//! RISC-V traps are divided into two categories:
//! - **Exceptions**: Synchronous events caused by instruction execution
//! - **Interrupts**: Asynchronous events from external sources

use core::fmt;
use core::mem::{offset_of, size_of};

use static_assertions::const_assert_eq;

use crate::arch::riscv64::core::csr::{Csr, TrapCause};
use crate::arch::riscv64::hart::Hart;

/// Captured trap state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapContext {
    /// Raw scause
    pub cause: u64,
    /// sepc: faulting or interrupted instruction
    pub pc: u64,
    /// stval: faulting address or instruction bits
    pub value: u64,
}

impl TrapContext {
    /// Build from raw register values
    pub const fn new(cause: u64, pc: u64, value: u64) -> Self {
        Self { cause, pc, value }
    }

    /// Read scause, sepc and stval
    pub fn capture<H: Hart + ?Sized>(hart: &H) -> Self {
        Self {
            cause: hart.read_csr(Csr::Scause),
            pc: hart.read_csr(Csr::Sepc),
            value: hart.read_csr(Csr::Stval),
        }
    }

    /// Decoded cause
    pub const fn trap_cause(&self) -> TrapCause {
        TrapCause::from_scause(self.cause)
    }

    /// Check if this trap is an interrupt
    pub const fn is_interrupt(&self) -> bool {
        self.trap_cause().is_interrupt
    }

    /// Address of the instruction after the trapping one
    ///
    /// Assumes a 4-byte instruction.
    pub const fn next_pc(&self) -> u64 {
        self.pc.wrapping_add(4)
    }
}

impl fmt::Display for TrapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scause={:#018x} sepc={:#018x} stval={:#018x}",
            self.cause, self.pc, self.value
        )
    }
}

// ============================================================================
// Entry Frame
// ============================================================================

/// Stack frame the trap entry stub pushes around the handler call
///
/// Holds the caller-saved integer and floating-point registers; the handler
/// preserves everything else under the C calling convention. The stub uses
/// `fsd`/`fld`, so `sstatus.FS` must be non-Off before the first trap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CallerSavedFrame {
    /// ra
    pub ra: u64,
    /// t0-t6
    pub t: [u64; 7],
    /// a0-a7
    pub a: [u64; 8],
    /// ft0-ft11
    pub ft: [u64; 12],
    /// fa0-fa7
    pub fa: [u64; 8],
}

impl CallerSavedFrame {
    /// Stack bytes reserved per trap
    pub const SIZE: usize = size_of::<Self>();
    /// Offset of `ft0`; `fa0` follows the twelve temporaries
    pub const FP_OFFSET: usize = offset_of!(Self, ft);
}

// sp stays 16-byte aligned across the handler call
const_assert_eq!(CallerSavedFrame::SIZE % 16, 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv64::core::csr::{exception, CAUSE_INTERRUPT_BIT};
    use crate::mock::MockHart;

    #[test]
    fn test_capture_reads_trap_csrs() {
        let mut hart = MockHart::new();
        hart.raise(exception::ILLEGAL_INSTRUCTION, 0x8020_0010, 0xdead);

        let ctx = TrapContext::capture(&hart);
        assert_eq!(ctx, TrapContext::new(2, 0x8020_0010, 0xdead));
        assert!(!ctx.is_interrupt());
        assert_eq!(ctx.trap_cause().name(), "Illegal Instruction");
    }

    #[test]
    fn test_next_pc() {
        let ctx = TrapContext::new(exception::BREAKPOINT, 0x1000, 0);
        assert_eq!(ctx.next_pc(), 0x1004);
    }

    #[test]
    fn test_entry_frame_layout() {
        assert_eq!(offset_of!(CallerSavedFrame, a), 64);
        assert_eq!(CallerSavedFrame::FP_OFFSET, 128);
        assert_eq!(offset_of!(CallerSavedFrame, fa), CallerSavedFrame::FP_OFFSET + 12 * 8);
        assert_eq!(CallerSavedFrame::SIZE, 36 * 8);
    }

    #[test]
    fn test_fs_initial_enables_fp() {
        use crate::arch::riscv64::core::csr::status;

        let fs = status::FS_INITIAL & status::FS_MASK;
        assert_ne!(fs, 0);
        assert_eq!(fs >> 13, 1);
    }

    #[test]
    fn test_display_is_raw() {
        let ctx = TrapContext::new(CAUSE_INTERRUPT_BIT | 5, 0x80, 0);
        let text = ctx.to_string();
        assert!(text.contains("scause=0x8000000000000005"));
        assert!(text.contains("sepc=0x0000000000000080"));
    }
}
