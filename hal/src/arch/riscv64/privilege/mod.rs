//! # RISC-V Supervisor Privilege Support
//!
//! Trap context capture, the entry frame layout and trap vector encoding.

pub mod traps;
pub mod vectors;

pub use traps::{CallerSavedFrame, TrapContext};
pub use vectors::{TrapVector, TrapVectorMode};
