//! # Sable Early Boot
//!
//! Supervisor-mode bring-up for a single RISC-V 64 hart, from firmware
//! hand-off to power-off.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────────┐
//! │                        SABLE EARLY BOOT                                          │
//! │                        ════════════════                                          │
//! │                                                                                  │
//! │   firmware (a0 = hart id, a1 = config blob)                                      │
//! │        │                                                                         │
//! │        ▼                                                                         │
//! │   ┌──────────┐   ┌────────────┐   ┌────────────────┐   ┌──────────────┐         │
//! │   │  stages  │──▶│ validation │──▶│     memory     │──▶│    traps     │         │
//! │   │ sequence │   │  6 checks  │   │ 4 GiB identity │   │ stvec + sie  │         │
//! │   └──────────┘   └────────────┘   └────────────────┘   └──────────────┘         │
//! │        │                                                                         │
//! │        ▼                                                                         │
//! │   ┌──────────────────────────────────────────────────────────────────────┐      │
//! │   │                 sable-hal: Hart trait + SBI call gate                 │      │
//! │   └──────────────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sable_early_boot::{BootConfig, BootContext, BootSequence, HartBootInfo};
//!
//! let ctx = BootContext::new(HartBootInfo::new(hart_id, dtb), BootConfig::new());
//! BootSequence::new(&ctx, &mut hart).run(&reader, &mut arena, &TRAPS, trap_entry as u64)
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod core;
pub mod drivers;
pub mod error;
pub mod info;
pub mod memory;
pub mod stages;
pub mod traps;
pub mod validation;

pub use crate::core::{BootContext, BootStage};
pub use crate::drivers::ConsoleLogger;
pub use crate::error::{BootError, BootResult, ValidationError};
pub use crate::info::{BlobReader, BlobWindow, ConfigBlobHeader, DirectMemory, HartBootInfo};
pub use crate::memory::{AddressSpaceBuilder, IdentityMap, PageTableArena};
pub use crate::stages::BootSequence;
pub use crate::traps::{
    dispatch, report_fatal, InterruptMask, TrapAction, TrapOutcome, TrapState, TrapSubsystem, TrapTable,
};
pub use crate::validation::validate;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default first console line
pub const BANNER: &str = concat!("Sable ", env!("CARGO_PKG_VERSION"), ": RISC-V 64 supervisor bring-up");

/// Default idle period in time-counter ticks (one second at 10 MHz)
pub const DEFAULT_IDLE_TICKS: u64 = 10_000_000;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Sequencer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Run the firmware self-test after traps are on
    pub self_test: bool,

    /// Time-counter ticks to idle before power-off
    pub idle_ticks: u64,

    /// Interrupt classes to unmask
    pub interrupts: InterruptMask,

    /// First console line
    pub banner: &'static str,
}

impl BootConfig {
    /// Full bring-up with self-test
    pub const fn new() -> Self {
        Self {
            self_test: true,
            idle_ticks: DEFAULT_IDLE_TICKS,
            interrupts: InterruptMask::all(),
            banner: BANNER,
        }
    }

    /// No self-test and no idle period
    pub const fn quiet() -> Self {
        Self {
            self_test: false,
            idle_ticks: 0,
            interrupts: InterruptMask::all(),
            banner: BANNER,
        }
    }

    /// Toggle the self-test
    pub const fn with_self_test(mut self, enabled: bool) -> Self {
        self.self_test = enabled;
        self
    }

    /// Set the idle period
    pub const fn with_idle_ticks(mut self, ticks: u64) -> Self {
        self.idle_ticks = ticks;
        self
    }

    /// Set the unmasked interrupt classes
    pub const fn with_interrupts(mut self, interrupts: InterruptMask) -> Self {
        self.interrupts = interrupts;
        self
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_presets() {
        let full = BootConfig::default();
        assert!(full.self_test);
        assert_eq!(full.idle_ticks, DEFAULT_IDLE_TICKS);
        assert_eq!(full.interrupts, InterruptMask::all());

        let quiet = BootConfig::quiet();
        assert!(!quiet.self_test);
        assert_eq!(quiet.idle_ticks, 0);
    }

    #[test]
    fn test_config_builders() {
        let config = BootConfig::quiet()
            .with_self_test(true)
            .with_idle_ticks(5)
            .with_interrupts(InterruptMask::EXTERNAL);
        assert!(config.self_test);
        assert_eq!(config.idle_ticks, 5);
        assert_eq!(config.interrupts, InterruptMask::EXTERNAL);
    }

    #[test]
    fn test_banner_carries_version() {
        assert!(BANNER.starts_with("Sable "));
        assert!(BANNER.contains(VERSION));
    }
}
