//! # SBI System Reset
//!
//! Power-off requests. [`shutdown`] prefers the SRST extension
//! and falls back to the legacy shutdown call on firmware that lacks it.
//! Either way exactly one shutdown request is issued; if the firmware
//! returns, the hart halts.

use super::base::is_extension_available;
use super::{call_0, call_2, eid, SbiRet};
use crate::arch::riscv64::hart::Hart;

/// System reset types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResetType {
    /// Power off
    Shutdown = 0,
}

/// System reset reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResetReason {
    /// No reason given
    NoReason = 0,
    /// System failure
    SystemFailure = 1,
}

/// Request a system reset through SRST
///
/// Returns only if the firmware rejects the request.
pub fn system_reset<H: Hart + ?Sized>(hart: &mut H, reset_type: ResetType, reason: ResetReason) -> SbiRet {
    call_2(hart, eid::SRST, 0, reset_type as u64, reason as u64)
}

/// Power off the machine
pub fn shutdown<H: Hart + ?Sized>(hart: &mut H) -> ! {
    shutdown_with_reason(hart, ResetReason::NoReason)
}

/// Power off the machine, reporting `reason` where the firmware supports it
pub fn shutdown_with_reason<H: Hart + ?Sized>(hart: &mut H, reason: ResetReason) -> ! {
    if is_extension_available(hart, eid::SRST) {
        let _ = system_reset(hart, ResetType::Shutdown, reason);
    } else {
        let _ = call_0(hart, eid::LEGACY_SHUTDOWN, 0);
    }

    hart.halt()
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::mock::MockHart;

    #[test]
    fn test_shutdown_prefers_srst() {
        let mut hart = MockHart::new();
        let result = catch_unwind(AssertUnwindSafe(|| shutdown(&mut hart)));
        assert!(result.is_err());

        assert_eq!(hart.calls_to(eid::SRST), 1);
        assert_eq!(hart.calls_to(eid::LEGACY_SHUTDOWN), 0);
        assert_eq!(hart.shutdown_requests(), 1);
        assert!(hart.is_halted());
    }

    #[test]
    fn test_shutdown_legacy_fallback() {
        let mut hart = MockHart::new().without_extension(eid::SRST);
        let _ = catch_unwind(AssertUnwindSafe(|| shutdown(&mut hart)));

        assert_eq!(hart.calls_to(eid::SRST), 0);
        assert_eq!(hart.calls_to(eid::LEGACY_SHUTDOWN), 1);
        assert_eq!(hart.shutdown_requests(), 1);
    }

    #[test]
    fn test_failure_reason_is_forwarded() {
        let mut hart = MockHart::new();
        let _ = catch_unwind(AssertUnwindSafe(|| {
            shutdown_with_reason(&mut hart, ResetReason::SystemFailure)
        }));

        let reset = hart
            .sbi_calls()
            .iter()
            .find(|call| call.extension_id == eid::SRST)
            .copied()
            .unwrap();
        assert_eq!(reset.args[0], ResetType::Shutdown as u64);
        assert_eq!(reset.args[1], ResetReason::SystemFailure as u64);
    }
}
