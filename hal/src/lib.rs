//! # Sable Hardware Abstraction Layer
//!
//! Processor-level building blocks for the Sable supervisor kernel:
//!
//! - CSR layouts, trap causes and the `stvec` encoding
//! - Sv39 page table entries, tables and `satp` values
//! - The SBI firmware call gate
//! - The [`Hart`](arch::riscv64::Hart) trait, the only place privileged
//!   instructions are issued
//!
//! With the `mock` feature (always on in this crate's own tests) the
//! [`mock`] module provides a recording hart for host-side testing.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(any(test, feature = "mock"))]
extern crate alloc;

pub mod arch;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use arch::riscv64::{Csr, Hart, SbiCall, SbiRet, TrapCause, TrapContext};

/// HAL version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
