//! # SBI Base Extension
//!
//! The base extension is mandatory and provides core SBI functionality.
//!
//! ## Functions
//!
//! - `get_spec_version`: Get SBI specification version
//! - `get_impl_id`: Get SBI implementation ID
//! - `get_impl_version`: Get SBI implementation version
//! - `probe_extension`: Check if an extension is available

use core::fmt;

use super::{base_fid, call_0, call_1, eid, SbiRet};
use crate::arch::riscv64::hart::Hart;

/// Get the SBI specification version
pub fn get_spec_version<H: Hart + ?Sized>(hart: &mut H) -> SbiRet {
    call_0(hart, eid::BASE, base_fid::GET_SPEC_VERSION)
}

/// Get the SBI implementation ID
pub fn get_impl_id<H: Hart + ?Sized>(hart: &mut H) -> SbiRet {
    call_0(hart, eid::BASE, base_fid::GET_IMPL_ID)
}

/// Get the SBI implementation version
pub fn get_impl_version<H: Hart + ?Sized>(hart: &mut H) -> SbiRet {
    call_0(hart, eid::BASE, base_fid::GET_IMPL_VERSION)
}

/// Probe for an extension
///
/// A successful return with a nonzero value means the extension is present.
pub fn probe_extension<H: Hart + ?Sized>(hart: &mut H, extension_id: u64) -> SbiRet {
    call_1(hart, eid::BASE, base_fid::PROBE_EXTENSION, extension_id)
}

/// Check if an extension is available
pub fn is_extension_available<H: Hart + ?Sized>(hart: &mut H, extension_id: u64) -> bool {
    matches!(probe_extension(hart, extension_id).ok(), Some(value) if value != 0)
}

// ============================================================================
// Version / Implementation Decoding
// ============================================================================

/// Decoded specification version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecVersion {
    /// Major version (bits 24..=30)
    pub major: u32,
    /// Minor version (bits 0..=23)
    pub minor: u32,
}

impl SpecVersion {
    /// Decode the raw value returned by `get_spec_version`
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            major: ((raw >> 24) & 0x7F) as u32,
            minor: (raw & 0xFF_FFFF) as u32,
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Human-readable name for an implementation ID
pub const fn impl_name(impl_id: u64) -> &'static str {
    match impl_id {
        0 => "Berkeley Boot Loader (BBL)",
        1 => "OpenSBI",
        2 => "Xvisor",
        3 => "KVM",
        4 => "RustSBI",
        5 => "Diosix",
        6 => "Coffer",
        7 => "Xen Project",
        8 => "PolarFire Hart Software Services",
        9 => "coreboot",
        10 => "oreboot",
        _ => "Unknown",
    }
}
