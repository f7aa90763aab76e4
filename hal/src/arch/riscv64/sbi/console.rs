//! # SBI Console
//!
//! Byte-at-a-time console I/O through the legacy console calls, plus a
//! [`core::fmt::Write`] adapter for formatted output.

use core::fmt;

use super::{call_0, call_1, eid, SbiRet};
use crate::arch::riscv64::hart::Hart;

/// Write one byte to the firmware console
pub fn console_putchar<H: Hart + ?Sized>(hart: &mut H, byte: u8) -> SbiRet {
    call_1(hart, eid::LEGACY_CONSOLE_PUTCHAR, 0, u64::from(byte))
}

/// Read one byte from the firmware console
///
/// Legacy calls report the character in `a0`; a negative value means no
/// input is pending.
pub fn console_getchar<H: Hart + ?Sized>(hart: &mut H) -> Option<u8> {
    let ret = call_0(hart, eid::LEGACY_CONSOLE_GETCHAR, 0);
    if ret.error < 0 {
        None
    } else {
        Some(ret.error as u8)
    }
}

// ============================================================================
// Formatted Output
// ============================================================================

/// Formatted writer over the firmware console
///
/// Line feeds are expanded to CR LF.
pub struct SbiConsole<'h, H: Hart + ?Sized> {
    hart: &'h mut H,
}

impl<'h, H: Hart + ?Sized> SbiConsole<'h, H> {
    /// Borrow a hart for console output
    pub fn new(hart: &'h mut H) -> Self {
        Self { hart }
    }

    /// Give the hart back
    pub fn into_inner(self) -> &'h mut H {
        self.hart
    }
}

impl<H: Hart + ?Sized> fmt::Debug for SbiConsole<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SbiConsole").finish_non_exhaustive()
    }
}

impl<H: Hart + ?Sized> fmt::Write for SbiConsole<'_, H> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                console_putchar(self.hart, b'\r');
            }
            console_putchar(self.hart, byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use super::*;
    use crate::mock::MockHart;

    #[test]
    fn test_putchar_is_legacy_call() {
        let mut hart = MockHart::new();
        console_putchar(&mut hart, b'A');

        let recorded = hart.sbi_calls()[0];
        assert_eq!(recorded.extension_id, eid::LEGACY_CONSOLE_PUTCHAR);
        assert_eq!(recorded.args[0], b'A' as u64);
        assert_eq!(hart.console_output(), "A");
    }

    #[test]
    fn test_getchar() {
        let mut hart = MockHart::new();
        assert_eq!(console_getchar(&mut hart), None);

        hart.push_input(b"ok");
        assert_eq!(console_getchar(&mut hart), Some(b'o'));
        assert_eq!(console_getchar(&mut hart), Some(b'k'));
        assert_eq!(console_getchar(&mut hart), None);
    }

    #[test]
    fn test_console_expands_newlines() {
        let mut hart = MockHart::new();
        let mut console = SbiConsole::new(&mut hart);
        writeln!(console, "hart {}", 3).unwrap();

        assert_eq!(hart.console_output(), "hart 3\r\n");
    }

    #[test]
    fn test_console_debug() {
        let mut hart = MockHart::new();
        let console = SbiConsole::new(&mut hart);
        assert_eq!(format!("{:?}", console), "SbiConsole { .. }");
    }
}
