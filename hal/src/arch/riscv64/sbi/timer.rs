//! # SBI Timer Extension
//!
//! Timer management via SBI.

use super::base::is_extension_available;
use super::{call_1, eid, SbiRet};
use crate::arch::riscv64::core::csr::Csr;
use crate::arch::riscv64::hart::Hart;

/// Set the timer deadline
///
/// Programs the timer to generate an interrupt when the time reaches `stime_value`.
pub fn set_timer<H: Hart + ?Sized>(hart: &mut H, stime_value: u64) -> SbiRet {
    call_1(hart, eid::TIME, 0, stime_value)
}

/// Program the deadline through TIME, or the legacy call when TIME is absent
pub fn program_timer<H: Hart + ?Sized>(hart: &mut H, stime_value: u64) -> SbiRet {
    if is_extension_available(hart, eid::TIME) {
        set_timer(hart, stime_value)
    } else {
        // Legacy calls report only a0
        let ret = call_1(hart, eid::LEGACY_SET_TIMER, 0, stime_value);
        SbiRet { error: ret.error, value: 0 }
    }
}

/// Clear the timer by setting it to the maximum value
pub fn clear_timer<H: Hart + ?Sized>(hart: &mut H) -> SbiRet {
    program_timer(hart, u64::MAX)
}

/// Read the current time counter
#[inline]
pub fn read_time<H: Hart + ?Sized>(hart: &H) -> u64 {
    hart.read_csr(Csr::Time)
}

/// Set a relative timer (current time + delay)
pub fn set_timer_relative<H: Hart + ?Sized>(hart: &mut H, delay: u64) -> SbiRet {
    let now = read_time(hart);
    set_timer(hart, now.saturating_add(delay))
}
