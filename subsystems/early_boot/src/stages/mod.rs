//! # Boot Sequencing
//!
//! One parameterized sequence drives the hart from entry to power-off.
//!
//! ## Execution Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                       BOOT SEQUENCE EXECUTION                                │
//! │                                                                              │
//! │   banner ──▶ validate ──▶ identity map ──▶ satp ──▶ stvec/sie/SIE           │
//! │                 │                                        │                   │
//! │                 │ Err                                    ▼                   │
//! │                 │                              SBI self-test (optional)      │
//! │                 │                                        │                   │
//! │                 ▼                                        ▼                   │
//! │          ERROR line ──▶ shutdown(SystemFailure)    idle ──▶ shutdown        │
//! │                                                                              │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No stage is skipped on failure: the first error powers the machine off.

use core::fmt::{self, Write};

use sable_hal::arch::riscv64::sbi::{self, eid, ResetReason, SbiConsole, SpecVersion};
use sable_hal::Hart;
use spin::Mutex;

use crate::core::{BootContext, BootStage};
use crate::error::BootResult;
use crate::info::BlobReader;
use crate::memory::{AddressSpaceBuilder, PageTableArena};
use crate::traps::{InterruptMask, TrapSubsystem};
use crate::validation::validate;

/// Extensions probed by the self-test
const PROBED_EXTENSIONS: [(&str, u64); 6] = [
    ("TIME", eid::TIME),
    ("IPI", eid::IPI),
    ("RFENCE", eid::RFENCE),
    ("HSM", eid::HSM),
    ("SRST", eid::SRST),
    ("legacy console", eid::LEGACY_CONSOLE_PUTCHAR),
];

// =============================================================================
// BOOT SEQUENCE
// =============================================================================

/// Boot sequence for one hart
pub struct BootSequence<'c, 'h, H: Hart + ?Sized> {
    ctx: &'c BootContext,
    hart: &'h mut H,
}

impl<'c, 'h, H: Hart + ?Sized> BootSequence<'c, 'h, H> {
    /// Create a sequence
    pub fn new(ctx: &'c BootContext, hart: &'h mut H) -> Self {
        Self { ctx, hart }
    }

    /// Run every stage, then power off
    ///
    /// `arena` receives the identity map and must stay untouched for as long
    /// as paging is on. `vector_entry` is the address of the assembly trap
    /// entry.
    pub fn run<R: BlobReader + ?Sized>(
        mut self,
        reader: &R,
        arena: &mut PageTableArena,
        traps: &Mutex<TrapSubsystem>,
        vector_entry: u64,
    ) -> ! {
        match self.bring_up(reader, arena, traps, vector_entry) {
            Ok(()) => {
                self.enter(BootStage::Shutdown);
                self.say(format_args!("[boot] bring-up complete, powering off"));
                sbi::shutdown(self.hart)
            },
            Err(err) => {
                log::error!("boot failed: {}", err);
                self.say(format_args!("[boot] ERROR: {}", err));
                self.say(format_args!("[boot] halting"));
                sbi::shutdown_with_reason(self.hart, ResetReason::SystemFailure)
            },
        }
    }

    fn bring_up<R: BlobReader + ?Sized>(
        &mut self,
        reader: &R,
        arena: &mut PageTableArena,
        traps: &Mutex<TrapSubsystem>,
        vector_entry: u64,
    ) -> BootResult<()> {
        let config = *self.ctx.config();

        self.enter(BootStage::Banner);
        self.banner();

        self.enter(BootStage::Validate);
        let header = validate(self.hart, self.ctx.info(), reader)?;
        log::info!("config blob v{}, {} bytes", header.version, header.total_size);

        self.enter(BootStage::AddressSpace);
        let map = AddressSpaceBuilder::new(arena).build_identity_map();
        let satp = map.activate(self.hart);
        self.say(format_args!("[boot] paging on: {}", satp));

        self.enter(BootStage::Traps);
        if config.interrupts.contains(InterruptMask::TIMER) {
            // No deadline until someone asks for one
            let ret = sbi::clear_timer(self.hart);
            if let Err(err) = ret.into_result() {
                log::warn!("could not clear timer: {}", err);
            }
        }
        traps.lock().install_vector_and_enable(self.hart, vector_entry, config.interrupts)?;
        self.say(format_args!(
            "[boot] traps on: stvec={:#x} sie={:?}",
            vector_entry, config.interrupts
        ));

        if config.self_test {
            self.enter(BootStage::SelfTest);
            self.self_test();
        }

        self.enter(BootStage::Idle);
        self.idle(config.idle_ticks);
        Ok(())
    }

    fn enter(&mut self, stage: BootStage) {
        log::debug!("entering {}", stage);
    }

    fn banner(&mut self) {
        let info = *self.ctx.info();
        let banner = self.ctx.config().banner;
        self.say(format_args!("{}", banner));
        self.say(format_args!("[boot] hart {}", info.hart_id()));
        self.say(format_args!("[boot] config blob {:#x}", info.config_blob_address()));
    }

    /// Exercise the firmware interface
    ///
    /// Failures are printed and otherwise ignored.
    fn self_test(&mut self) {
        match sbi::get_spec_version(self.hart).into_result() {
            Ok(raw) => self.say(format_args!("[selftest] SBI spec {}", SpecVersion::from_raw(raw))),
            Err(err) => self.say(format_args!("[selftest] spec version failed: {}", err)),
        }

        match sbi::get_impl_id(self.hart).into_result() {
            Ok(id) => self.say(format_args!("[selftest] implementation {} (id {})", sbi::impl_name(id), id)),
            Err(err) => self.say(format_args!("[selftest] implementation id failed: {}", err)),
        }

        match sbi::get_impl_version(self.hart).into_result() {
            Ok(version) => self.say(format_args!("[selftest] implementation version {:#x}", version)),
            Err(err) => self.say(format_args!("[selftest] implementation version failed: {}", err)),
        }

        for (name, extension_id) in PROBED_EXTENSIONS {
            match sbi::probe_extension(self.hart, extension_id).into_result() {
                Ok(0) => self.say(format_args!("[selftest] {} absent", name)),
                Ok(_) => self.say(format_args!("[selftest] {} present", name)),
                Err(err) => self.say(format_args!("[selftest] {} probe failed: {}", name, err)),
            }
        }
    }

    /// Busy-wait for `ticks` of the time counter
    fn idle(&mut self, ticks: u64) {
        let start = sbi::read_time(self.hart);
        while sbi::read_time(self.hart).wrapping_sub(start) < ticks {
            ::core::hint::spin_loop();
        }
        log::debug!("idle for {} ticks", ticks);
    }

    fn say(&mut self, args: fmt::Arguments<'_>) {
        let mut console = SbiConsole::new(&mut *self.hart);
        let _ = writeln!(console, "{}", args);
    }
}

impl<H: Hart + ?Sized> fmt::Debug for BootSequence<'_, '_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootSequence").field("ctx", self.ctx).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use sable_hal::arch::riscv64::sbi::SbiRet;
    use sable_hal::mock::MockHart;

    use super::*;
    use crate::info::HartBootInfo;
    use crate::BootConfig;

    fn context() -> BootContext {
        BootContext::new(HartBootInfo::new(0, 0x8220_0000), BootConfig::new())
    }

    #[test]
    fn test_self_test_reports_firmware() {
        let ctx = context();
        let mut hart = MockHart::new().without_extension(eid::HSM);
        BootSequence::new(&ctx, &mut hart).self_test();

        let out = hart.console_output();
        assert!(out.contains("[selftest] SBI spec 2.0\r\n"));
        assert!(out.contains("[selftest] implementation OpenSBI (id 1)\r\n"));
        assert!(out.contains("[selftest] implementation version 0x10004\r\n"));
        assert!(out.contains("[selftest] TIME present\r\n"));
        assert!(out.contains("[selftest] HSM absent\r\n"));
        assert!(out.contains("[selftest] legacy console present\r\n"));
        assert_eq!(hart.calls_to(eid::BASE), 3 + PROBED_EXTENSIONS.len());
    }

    #[test]
    fn test_self_test_survives_failures() {
        let ctx = context();
        let mut hart = MockHart::new();
        hart.respond(
            eid::BASE,
            sbi::base_fid::GET_IMPL_ID,
            SbiRet::failure(sbi::SbiError::NotSupported),
        );
        BootSequence::new(&ctx, &mut hart).self_test();

        let out = hart.console_output();
        assert!(out.contains("implementation id failed"));
        assert!(out.contains("[selftest] SRST present"));
        assert!(!hart.is_halted());
    }

    #[test]
    fn test_idle_waits_for_ticks() {
        let ctx = context();
        let mut hart = MockHart::new();
        hart.set_time(1000);
        BootSequence::new(&ctx, &mut hart).idle(50);
        assert!(hart.csr(sable_hal::Csr::Time) >= 1050);
    }

    #[test]
    fn test_banner_names_hart() {
        let ctx = BootContext::new(HartBootInfo::new(3, 0x8220_0000), BootConfig::new());
        let mut hart = MockHart::new();
        BootSequence::new(&ctx, &mut hart).banner();

        let out = hart.console_output();
        assert!(out.starts_with(BootConfig::new().banner));
        assert!(out.contains("[boot] hart 3\r\n"));
        assert!(out.contains("[boot] config blob 0x82200000\r\n"));
    }
}
