//! # Core Boot Abstractions
//!
//! The immutable boot context and the stage model.
//!
//! ## Boot Stage Model
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                         BOOT STAGE SEQUENCE                             │
//! │                                                                         │
//! │  ┌────────┐  ┌──────────┐  ┌─────────┐  ┌───────┐  ┌──────────┐        │
//! │  │ Banner │─▶│ Validate │─▶│ Address │─▶│ Traps │─▶│ SelfTest │──┐     │
//! │  └────────┘  └──────────┘  │  Space  │  └───────┘  └──────────┘  │     │
//! │                   │        └─────────┘                           │     │
//! │                   ▼                       ┌──────────┐  ┌──────┐ │     │
//! │              ┌─────────┐                  │ Shutdown │◀─│ Idle │◀┘     │
//! │              │  Error  │─────────────────▶│          │  └──────┘       │
//! │              └─────────┘                  └──────────┘                 │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

use core::fmt;

use crate::info::HartBootInfo;
use crate::BootConfig;

// =============================================================================
// BOOT STAGES
// =============================================================================

/// Boot stage enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BootStage {
    /// Identify the kernel and the hand-off registers
    Banner = 0,
    /// Check the firmware hand-off
    Validate = 1,
    /// Build the identity map and enable paging
    AddressSpace = 2,
    /// Install the trap vector and unmask interrupts
    Traps = 3,
    /// Exercise the firmware interface (optional)
    SelfTest = 4,
    /// Steady-state wait
    Idle = 5,
    /// Power off
    Shutdown = 6,
}

impl BootStage {
    /// Get stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Validate => "validate",
            Self::AddressSpace => "address-space",
            Self::Traps => "traps",
            Self::SelfTest => "self-test",
            Self::Idle => "idle",
            Self::Shutdown => "shutdown",
        }
    }

    /// Following stage, if any
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Banner => Some(Self::Validate),
            Self::Validate => Some(Self::AddressSpace),
            Self::AddressSpace => Some(Self::Traps),
            Self::Traps => Some(Self::SelfTest),
            Self::SelfTest => Some(Self::Idle),
            Self::Idle => Some(Self::Shutdown),
            Self::Shutdown => None,
        }
    }
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", *self as u8, self.name())
    }
}

// =============================================================================
// BOOT CONTEXT
// =============================================================================

/// Everything the boot sequence knows, fixed at entry
#[derive(Debug, Clone, Copy)]
pub struct BootContext {
    info: HartBootInfo,
    config: BootConfig,
}

impl BootContext {
    /// Create a context
    pub const fn new(info: HartBootInfo, config: BootConfig) -> Self {
        Self { info, config }
    }

    /// Firmware hand-off
    pub const fn info(&self) -> &HartBootInfo {
        &self.info
    }

    /// Sequencer parameters
    pub const fn config(&self) -> &BootConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = BootStage::Banner;
        let mut count = 1;
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            count += 1;
        }
        assert_eq!(stage, BootStage::Shutdown);
        assert_eq!(count, 7);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(BootStage::AddressSpace.to_string(), "stage 2 (address-space)");
    }

    #[test]
    fn test_context_accessors() {
        let ctx = BootContext::new(HartBootInfo::new(1, 0x8220_0000), BootConfig::quiet());
        assert_eq!(ctx.info().hart_id(), 1);
        assert!(!ctx.config().self_test);
    }
}
