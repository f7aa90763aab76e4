//! # RISC-V Core Definitions

pub mod csr;

pub use csr::{Csr, TrapCause};
