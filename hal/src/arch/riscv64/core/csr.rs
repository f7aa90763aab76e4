//! # RISC-V Supervisor CSRs
//!
//! Names, addresses and bit layouts of the supervisor-level control and
//! status registers the boot core touches. Access itself goes through the
//! [`Hart`](crate::arch::riscv64::hart::Hart) trait; this module only
//! describes the registers.
//!
//! ## CSR Address Encoding
//!
//! CSR addresses are 12-bit values encoded as:
//! - Bits [11:10]: Read/Write access (11 = read-only)
//! - Bits [9:8]: Lowest privilege level that can access
//! - Bits [7:0]: Register index

use core::fmt;

// ============================================================================
// Register Set
// ============================================================================

/// Supervisor CSRs reachable through the hart seam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Csr {
    /// Supervisor status register
    Sstatus = 0x100,
    /// Supervisor interrupt enable
    Sie = 0x104,
    /// Supervisor trap handler base address
    Stvec = 0x105,
    /// Supervisor scratch register
    Sscratch = 0x140,
    /// Supervisor exception program counter
    Sepc = 0x141,
    /// Supervisor trap cause
    Scause = 0x142,
    /// Supervisor trap value
    Stval = 0x143,
    /// Supervisor interrupt pending
    Sip = 0x144,
    /// Supervisor address translation and protection
    Satp = 0x180,
    /// Timer (read-only shadow of mtime)
    Time = 0xC01,
}

impl Csr {
    /// Number of registers in the set
    pub const COUNT: usize = 10;

    /// Every register, in address order
    pub const ALL: [Csr; Self::COUNT] = [
        Csr::Sstatus,
        Csr::Sie,
        Csr::Stvec,
        Csr::Sscratch,
        Csr::Sepc,
        Csr::Scause,
        Csr::Stval,
        Csr::Sip,
        Csr::Satp,
        Csr::Time,
    ];

    /// 12-bit CSR address
    pub const fn address(self) -> u16 {
        self as u16
    }

    /// Dense index in `0..COUNT`
    pub const fn index(self) -> usize {
        match self {
            Csr::Sstatus => 0,
            Csr::Sie => 1,
            Csr::Stvec => 2,
            Csr::Sscratch => 3,
            Csr::Sepc => 4,
            Csr::Scause => 5,
            Csr::Stval => 6,
            Csr::Sip => 7,
            Csr::Satp => 8,
            Csr::Time => 9,
        }
    }

    /// Whether the address encodes a read-only register
    pub const fn is_read_only(self) -> bool {
        (self.address() >> 10) & 0b11 == 0b11
    }

    /// Assembler mnemonic
    pub const fn name(self) -> &'static str {
        match self {
            Csr::Sstatus => "sstatus",
            Csr::Sie => "sie",
            Csr::Stvec => "stvec",
            Csr::Sscratch => "sscratch",
            Csr::Sepc => "sepc",
            Csr::Scause => "scause",
            Csr::Stval => "stval",
            Csr::Sip => "sip",
            Csr::Satp => "satp",
            Csr::Time => "time",
        }
    }
}

impl fmt::Display for Csr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Status Register Bits (sstatus)
// ============================================================================

/// Status register bits
pub mod status {
    /// Supervisor Interrupt Enable
    pub const SIE: u64 = 1 << 1;
    /// Floating-point state field
    pub const FS_MASK: u64 = 0b11 << 13;
    /// FS = Initial: FP registers usable, nothing dirty yet
    pub const FS_INITIAL: u64 = 1 << 13;
}

// ============================================================================
// Interrupt Enable/Pending Bits (sie/sip)
// ============================================================================

/// Interrupt bits
pub mod interrupt {
    /// Supervisor Software Interrupt
    pub const SSIP: u64 = 1 << 1;
    /// Supervisor Timer Interrupt
    pub const STIP: u64 = 1 << 5;
    /// Supervisor External Interrupt
    pub const SEIP: u64 = 1 << 9;
}

// ============================================================================
// Trap Cause Codes (scause)
// ============================================================================

/// Exception cause codes (bit 63 = 0)
pub mod exception {
    /// Instruction address misaligned
    pub const INSTRUCTION_MISALIGNED: u64 = 0;
    /// Instruction access fault
    pub const INSTRUCTION_ACCESS_FAULT: u64 = 1;
    /// Illegal instruction
    pub const ILLEGAL_INSTRUCTION: u64 = 2;
    /// Breakpoint
    pub const BREAKPOINT: u64 = 3;
    /// Load address misaligned
    pub const LOAD_MISALIGNED: u64 = 4;
    /// Load access fault
    pub const LOAD_ACCESS_FAULT: u64 = 5;
    /// Store/AMO address misaligned
    pub const STORE_MISALIGNED: u64 = 6;
    /// Store/AMO access fault
    pub const STORE_ACCESS_FAULT: u64 = 7;
    /// Environment call from U-mode
    pub const ECALL_FROM_U: u64 = 8;
    /// Environment call from S-mode
    pub const ECALL_FROM_S: u64 = 9;
    /// Instruction page fault
    pub const INSTRUCTION_PAGE_FAULT: u64 = 12;
    /// Load page fault
    pub const LOAD_PAGE_FAULT: u64 = 13;
    /// Store/AMO page fault
    pub const STORE_PAGE_FAULT: u64 = 15;
}

/// Interrupt cause codes (bit 63 = 1)
pub mod irq_cause {
    /// Supervisor software interrupt
    pub const SUPERVISOR_SOFTWARE: u64 = 1;
    /// Supervisor timer interrupt
    pub const SUPERVISOR_TIMER: u64 = 5;
    /// Supervisor external interrupt
    pub const SUPERVISOR_EXTERNAL: u64 = 9;
}

/// Interrupt bit in cause register
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

// ============================================================================
// Trap Vector Modes (stvec)
// ============================================================================

/// Trap vector modes
pub mod tvec {
    /// Direct mode: all traps go to BASE
    pub const MODE_DIRECT: u64 = 0;
    /// Vectored mode: async interrupts go to BASE + 4*cause
    pub const MODE_VECTORED: u64 = 1;
    /// Mode mask
    pub const MODE_MASK: u64 = 0b11;
    /// Base address mask (4-byte aligned)
    pub const BASE_MASK: u64 = !0b11;
}

// ============================================================================
// Trap Cause
// ============================================================================

/// Decoded scause value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapCause {
    /// Is this an interrupt (true) or exception (false)?
    pub is_interrupt: bool,
    /// The cause code
    pub code: u64,
}

impl TrapCause {
    /// Parse from raw scause value
    pub const fn from_scause(scause: u64) -> Self {
        Self {
            is_interrupt: (scause & CAUSE_INTERRUPT_BIT) != 0,
            code: scause & !CAUSE_INTERRUPT_BIT,
        }
    }

    /// Exception with the given code
    pub const fn exception(code: u64) -> Self {
        Self {
            is_interrupt: false,
            code,
        }
    }

    /// Interrupt with the given code
    pub const fn interrupt(code: u64) -> Self {
        Self {
            is_interrupt: true,
            code,
        }
    }

    /// Re-encode as a raw scause value
    pub const fn to_scause(self) -> u64 {
        if self.is_interrupt {
            self.code | CAUSE_INTERRUPT_BIT
        } else {
            self.code
        }
    }

    /// Get cause name
    pub const fn name(&self) -> &'static str {
        if self.is_interrupt {
            match self.code {
                irq_cause::SUPERVISOR_SOFTWARE => "Supervisor Software Interrupt",
                irq_cause::SUPERVISOR_TIMER => "Supervisor Timer Interrupt",
                irq_cause::SUPERVISOR_EXTERNAL => "Supervisor External Interrupt",
                _ => "Unknown Interrupt",
            }
        } else {
            match self.code {
                exception::INSTRUCTION_MISALIGNED => "Instruction Address Misaligned",
                exception::INSTRUCTION_ACCESS_FAULT => "Instruction Access Fault",
                exception::ILLEGAL_INSTRUCTION => "Illegal Instruction",
                exception::BREAKPOINT => "Breakpoint",
                exception::LOAD_MISALIGNED => "Load Address Misaligned",
                exception::LOAD_ACCESS_FAULT => "Load Access Fault",
                exception::STORE_MISALIGNED => "Store/AMO Address Misaligned",
                exception::STORE_ACCESS_FAULT => "Store/AMO Access Fault",
                exception::ECALL_FROM_U => "Environment Call from U-mode",
                exception::ECALL_FROM_S => "Environment Call from S-mode",
                exception::INSTRUCTION_PAGE_FAULT => "Instruction Page Fault",
                exception::LOAD_PAGE_FAULT => "Load Page Fault",
                exception::STORE_PAGE_FAULT => "Store/AMO Page Fault",
                _ => "Unknown Exception",
            }
        }
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_addresses() {
        assert_eq!(Csr::Sstatus.address(), 0x100);
        assert_eq!(Csr::Stvec.address(), 0x105);
        assert_eq!(Csr::Satp.address(), 0x180);
        assert_eq!(Csr::Time.address(), 0xC01);
    }

    #[test]
    fn test_csr_dense_index() {
        for (i, csr) in Csr::ALL.iter().enumerate() {
            assert_eq!(csr.index(), i);
        }
    }

    #[test]
    fn test_only_time_is_read_only() {
        for csr in Csr::ALL {
            assert_eq!(csr.is_read_only(), csr == Csr::Time, "{}", csr);
        }
    }

    #[test]
    fn test_trap_cause_decode() {
        let cause = TrapCause::from_scause(CAUSE_INTERRUPT_BIT | irq_cause::SUPERVISOR_TIMER);
        assert!(cause.is_interrupt);
        assert_eq!(cause.code, 5);
        assert_eq!(cause.name(), "Supervisor Timer Interrupt");

        let cause = TrapCause::from_scause(exception::ILLEGAL_INSTRUCTION);
        assert!(!cause.is_interrupt);
        assert_eq!(cause.name(), "Illegal Instruction");
        assert_eq!(cause.to_scause(), 2);
    }
}
