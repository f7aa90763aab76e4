//! # RISC-V 64-bit Architecture HAL Implementation
//!
//! Hardware formats and privileged primitives for a single RV64GC hart
//! running in supervisor mode under SBI firmware.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Sable - RISC-V 64 HAL                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────┐ ┌───────────┐  │
//! │  │    Core     │ │ Privilege   │ │     MMU     │ │    SBI    │  │
//! │  │             │ │             │ │             │ │           │  │
//! │  │• CSR names  │ │• Trap ctx   │ │• Sv39 PTE   │ │• Base     │  │
//! │  │• Bit layout │ │• stvec      │ │• SATP       │ │• Timer    │  │
//! │  │• Causes     │ │             │ │• Tables     │ │• SRST     │  │
//! │  └─────────────┘ └─────────────┘ └─────────────┘ └───────────┘  │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │  Hart trait: CSR access, sfence.vma, ecall, wfi, halt     │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`core`]: CSR set, status/interrupt bits, trap cause codes
//! - [`hart`]: The [`Hart`] trait and the real hart implementation
//! - [`mmu`]: Page table entries, tables and SATP encoding
//! - [`privilege`]: Trap context and trap vector encoding
//! - [`sbi`]: Firmware call gate

pub mod core;
pub mod hart;
pub mod mmu;
pub mod privilege;
pub mod sbi;

pub use self::core::csr::{Csr, TrapCause};
pub use self::hart::Hart;
#[cfg(target_arch = "riscv64")]
pub use self::hart::Riscv64Hart;
pub use self::privilege::{TrapContext, TrapVector};
pub use self::sbi::{SbiCall, SbiError, SbiRet};
