//! # Architecture Support
//!
//! Only RISC-V 64 is supported. Its hardware formats compile on every host so
//! that code built on them can be tested off-target.

pub mod riscv64;
