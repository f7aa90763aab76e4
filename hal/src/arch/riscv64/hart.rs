//! # Hart Primitives
//!
//! The single seam between boot logic and the processor. Everything above
//! this trait is ordinary Rust and runs unchanged against
//! [`MockHart`](crate::mock::MockHart) on the host.
//!
//! ## Ordering
//!
//! Every CSR write, fence and `ecall` is a full compiler memory barrier:
//! no load or store is moved across it. Page-table stores therefore reach
//! memory before the `sfence.vma` that precedes a `satp` write.

use super::core::csr::Csr;
use super::sbi::{SbiCall, SbiRet};

/// Privileged operations of one hardware thread
pub trait Hart {
    /// Read a CSR
    fn read_csr(&self, csr: Csr) -> u64;

    /// Write a CSR
    ///
    /// Writes to read-only registers are ignored.
    fn write_csr(&mut self, csr: Csr, value: u64);

    /// Set bits in a CSR (`csrs`)
    fn set_csr_bits(&mut self, csr: Csr, bits: u64);

    /// Clear bits in a CSR (`csrc`)
    fn clear_csr_bits(&mut self, csr: Csr, bits: u64);

    /// Flush every address-translation cache entry (`sfence.vma zero, zero`)
    fn sfence_vma(&mut self);

    /// Trap into the firmware
    fn ecall(&mut self, call: &SbiCall) -> SbiRet;

    /// Stall until an interrupt is pending
    fn wait_for_interrupt(&mut self);

    /// Stop this hart for good
    fn halt(&mut self) -> !;
}

// ============================================================================
// RISC-V 64 Implementation
// ============================================================================

#[cfg(target_arch = "riscv64")]
pub use self::riscv::Riscv64Hart;

#[cfg(target_arch = "riscv64")]
mod riscv {
    use core::arch::asm;

    use super::{Csr, Hart, SbiCall, SbiRet};
    use crate::arch::riscv64::core::csr::status;

    /// Expand one asm statement per register; CSR names must be literals.
    macro_rules! csr_asm {
        ($csr:expr, $prefix:literal, $suffix:literal, time => $time:expr, $($operands:tt)*) => {
            match $csr {
                Csr::Sstatus => asm!(concat!($prefix, "sstatus", $suffix), $($operands)*),
                Csr::Sie => asm!(concat!($prefix, "sie", $suffix), $($operands)*),
                Csr::Stvec => asm!(concat!($prefix, "stvec", $suffix), $($operands)*),
                Csr::Sscratch => asm!(concat!($prefix, "sscratch", $suffix), $($operands)*),
                Csr::Sepc => asm!(concat!($prefix, "sepc", $suffix), $($operands)*),
                Csr::Scause => asm!(concat!($prefix, "scause", $suffix), $($operands)*),
                Csr::Stval => asm!(concat!($prefix, "stval", $suffix), $($operands)*),
                Csr::Sip => asm!(concat!($prefix, "sip", $suffix), $($operands)*),
                Csr::Satp => asm!(concat!($prefix, "satp", $suffix), $($operands)*),
                Csr::Time => $time,
            }
        };
    }

    /// The hart this code runs on, in supervisor mode
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Riscv64Hart;

    impl Hart for Riscv64Hart {
        #[inline]
        fn read_csr(&self, csr: Csr) -> u64 {
            let value: u64;
            unsafe {
                csr_asm!(
                    csr, "csrr {0}, ", "",
                    time => asm!("rdtime {0}", out(reg) value, options(nostack)),
                    out(reg) value, options(nostack)
                );
            }
            value
        }

        #[inline]
        fn write_csr(&mut self, csr: Csr, value: u64) {
            unsafe {
                csr_asm!(csr, "csrw ", ", {0}", time => (), in(reg) value, options(nostack));
            }
        }

        #[inline]
        fn set_csr_bits(&mut self, csr: Csr, bits: u64) {
            unsafe {
                csr_asm!(csr, "csrs ", ", {0}", time => (), in(reg) bits, options(nostack));
            }
        }

        #[inline]
        fn clear_csr_bits(&mut self, csr: Csr, bits: u64) {
            unsafe {
                csr_asm!(csr, "csrc ", ", {0}", time => (), in(reg) bits, options(nostack));
            }
        }

        #[inline]
        fn sfence_vma(&mut self) {
            unsafe {
                asm!("sfence.vma zero, zero", options(nostack));
            }
        }

        #[inline]
        fn ecall(&mut self, call: &SbiCall) -> SbiRet {
            let error: i64;
            let value: u64;
            unsafe {
                asm!(
                    "ecall",
                    inlateout("a0") call.args[0] => error,
                    inlateout("a1") call.args[1] => value,
                    in("a2") call.args[2],
                    in("a3") call.args[3],
                    in("a4") call.args[4],
                    in("a5") call.args[5],
                    in("a6") call.function_id,
                    in("a7") call.extension_id,
                    options(nostack)
                );
            }
            SbiRet { error, value }
        }

        #[inline]
        fn wait_for_interrupt(&mut self) {
            unsafe {
                asm!("wfi", options(nomem, nostack));
            }
        }

        fn halt(&mut self) -> ! {
            self.clear_csr_bits(Csr::Sstatus, status::SIE);
            loop {
                self.wait_for_interrupt();
            }
        }
    }
}
