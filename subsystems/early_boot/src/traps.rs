//! # Trap Subsystem
//!
//! Owns `stvec`, the supervisor interrupt mask and the policy for every trap
//! cause.
//!
//! ## State Machine
//!
//! ```text
//!  ┌───────────────┐  install   ┌────────────┐  trap   ┌─────────────┐
//!  │ Uninitialized │──────────▶│ Configured │───────▶│   Trapped   │
//!  └───────────────┘           └────────────┘◀───────└─────────────┘
//!                                    ▲   │   Resume/Retry      │
//!                                    └───┘ install             │ Fatal
//!                                                              ▼
//!                                                       ┌────────────┐
//!                                                       │  Terminal  │
//!                                                       └────────────┘
//! ```
//!
//! ## Dispatch
//!
//! A [`TrapTable`] maps each cause code to a [`TrapAction`]. Every entry
//! starts as [`TrapAction::Fatal`]: report `scause`, `sepc`, `stval` and
//! power off.

use core::fmt::Write;

use bitflags::bitflags;
use sable_hal::arch::riscv64::core::csr::{interrupt, status};
use sable_hal::arch::riscv64::privilege::TrapVector;
use sable_hal::arch::riscv64::sbi::{self, ResetReason, SbiConsole};
use sable_hal::{Csr, Hart, TrapCause, TrapContext};
use spin::Mutex;

use crate::error::{BootError, BootResult};

// =============================================================================
// INTERRUPT MASK
// =============================================================================

bitflags! {
    /// Supervisor interrupt classes (bit positions match `sie`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptMask: u64 {
        /// Supervisor software interrupt
        const SOFTWARE = interrupt::SSIP;
        /// Supervisor timer interrupt
        const TIMER = interrupt::STIP;
        /// Supervisor external interrupt
        const EXTERNAL = interrupt::SEIP;
    }
}

// =============================================================================
// DISPATCH TABLE
// =============================================================================

/// What to do after a trap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapAction {
    /// Continue after the trapping instruction (exceptions) or at the
    /// interrupted one (interrupts)
    Resume,
    /// Return to the same pc
    Retry,
    /// Report and power off
    #[default]
    Fatal,
}

/// Cause codes with their own table entry, per class
pub const TRAP_TABLE_SLOTS: usize = 16;

/// Per-cause trap policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapTable {
    exceptions: [TrapAction; TRAP_TABLE_SLOTS],
    interrupts: [TrapAction; TRAP_TABLE_SLOTS],
}

impl TrapTable {
    /// Every cause fatal
    pub const fn all_fatal() -> Self {
        Self {
            exceptions: [TrapAction::Fatal; TRAP_TABLE_SLOTS],
            interrupts: [TrapAction::Fatal; TRAP_TABLE_SLOTS],
        }
    }

    /// Set the action for an exception code
    ///
    /// Codes without a slot stay fatal.
    pub fn with_exception(mut self, code: u64, action: TrapAction) -> Self {
        if let Some(slot) = usize::try_from(code).ok().and_then(|i| self.exceptions.get_mut(i)) {
            *slot = action;
        }
        self
    }

    /// Set the action for an interrupt code
    pub fn with_interrupt(mut self, code: u64, action: TrapAction) -> Self {
        if let Some(slot) = usize::try_from(code).ok().and_then(|i| self.interrupts.get_mut(i)) {
            *slot = action;
        }
        self
    }

    /// Look up the action for a cause
    pub fn action_for(&self, cause: TrapCause) -> TrapAction {
        let slots = if cause.is_interrupt {
            &self.interrupts
        } else {
            &self.exceptions
        };
        usize::try_from(cause.code)
            .ok()
            .and_then(|i| slots.get(i))
            .copied()
            .unwrap_or_default()
    }
}

impl Default for TrapTable {
    fn default() -> Self {
        Self::all_fatal()
    }
}

// =============================================================================
// SUBSYSTEM
// =============================================================================

/// Trap subsystem state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapState {
    /// No vector installed
    Uninitialized,
    /// Vector installed, interrupts unmasked
    Configured,
    /// Inside a handler
    Trapped(TrapContext),
    /// Fatal trap seen; the machine is powering off
    Terminal,
}

/// How a handled trap returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// `sret` to `next_pc`
    Resumed {
        /// New sepc
        next_pc: u64,
    },
    /// `sret` to the trapping pc
    Retried {
        /// Unchanged sepc
        pc: u64,
    },
}

/// Trap vector, interrupt mask and dispatch policy
#[derive(Debug)]
pub struct TrapSubsystem {
    state: TrapState,
    table: TrapTable,
    vector: Option<TrapVector>,
    mask: InterruptMask,
}

impl TrapSubsystem {
    /// Create an unconfigured subsystem
    pub const fn new(table: TrapTable) -> Self {
        Self {
            state: TrapState::Uninitialized,
            table,
            vector: None,
            mask: InterruptMask::empty(),
        }
    }

    /// Current state
    pub fn state(&self) -> TrapState {
        self.state
    }

    /// Dispatch policy
    pub fn table(&self) -> &TrapTable {
        &self.table
    }

    /// Installed vector
    pub fn vector(&self) -> Option<TrapVector> {
        self.vector
    }

    /// Unmasked interrupt classes
    pub fn mask(&self) -> InterruptMask {
        self.mask
    }

    /// Point `stvec` at `vector_entry` (direct mode), unmask `mask` in `sie`,
    /// then set `sstatus.SIE`
    ///
    /// Calling it again with the same arguments leaves the hart unchanged.
    pub fn install_vector_and_enable<H: Hart + ?Sized>(
        &mut self,
        hart: &mut H,
        vector_entry: u64,
        mask: InterruptMask,
    ) -> BootResult<()> {
        match self.state {
            TrapState::Uninitialized | TrapState::Configured => {},
            TrapState::Trapped(_) | TrapState::Terminal => return Err(BootError::TrapStateConflict),
        }

        let vector = TrapVector::direct(vector_entry).ok_or(BootError::MisalignedTrapVector(vector_entry))?;

        hart.write_csr(Csr::Stvec, vector.to_stvec());
        hart.set_csr_bits(Csr::Sie, mask.bits());
        hart.set_csr_bits(Csr::Sstatus, status::SIE);

        self.vector = Some(vector);
        self.mask |= mask;
        self.state = TrapState::Configured;

        log::info!("trap vector at {:#x}, interrupts {:?}", vector.base, mask);
        Ok(())
    }

    /// Dispatch one trap
    ///
    /// Returns only for [`TrapAction::Resume`] and [`TrapAction::Retry`];
    /// `sepc` is already updated for the return.
    pub fn handle<H: Hart + ?Sized>(&mut self, hart: &mut H, ctx: TrapContext) -> TrapOutcome {
        if self.state != TrapState::Configured {
            // Nested or premature trap
            self.fatal(hart, ctx)
        }
        self.state = TrapState::Trapped(ctx);

        let cause = ctx.trap_cause();
        match self.table.action_for(cause) {
            TrapAction::Resume => {
                let next_pc = if cause.is_interrupt { ctx.pc } else { ctx.next_pc() };
                hart.write_csr(Csr::Sepc, next_pc);
                self.state = TrapState::Configured;
                log::debug!("resumed after {} at {:#x}", cause, ctx.pc);
                TrapOutcome::Resumed { next_pc }
            },
            TrapAction::Retry => {
                self.state = TrapState::Configured;
                log::debug!("retrying {} at {:#x}", cause, ctx.pc);
                TrapOutcome::Retried { pc: ctx.pc }
            },
            TrapAction::Fatal => self.fatal(hart, ctx),
        }
    }

    /// Report `ctx` and power off
    pub fn fatal<H: Hart + ?Sized>(&mut self, hart: &mut H, ctx: TrapContext) -> ! {
        self.state = TrapState::Terminal;
        report_fatal(hart, &ctx);
        sbi::shutdown_with_reason(hart, ResetReason::SystemFailure)
    }
}

/// Print the fatal-trap report
///
/// Also used when the subsystem itself cannot be reached.
pub fn report_fatal<H: Hart + ?Sized>(hart: &mut H, ctx: &TrapContext) {
    let mut console = SbiConsole::new(hart);
    let _ = writeln!(console, "[trap] FATAL {}", ctx.trap_cause().name());
    let _ = writeln!(console, "[trap] {}", ctx);
}

/// Trap entry point behind the assembly stub
///
/// Captures the trap CSRs and hands them to the subsystem. A subsystem that
/// is already locked means the trap hit while traps were being configured;
/// that is reported as fatal without touching the subsystem.
pub fn dispatch<H: Hart + ?Sized>(hart: &mut H, traps: &Mutex<TrapSubsystem>) -> TrapOutcome {
    let ctx = TrapContext::capture(hart);
    match traps.try_lock() {
        Some(mut subsystem) => subsystem.handle(hart, ctx),
        None => {
            report_fatal(hart, &ctx);
            sbi::shutdown_with_reason(hart, ResetReason::SystemFailure)
        },
    }
}
