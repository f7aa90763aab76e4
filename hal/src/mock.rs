//! # Recording Hart
//!
//! A [`Hart`] that runs on the host. CSRs are plain memory, `ecall`s are
//! answered by a small firmware model, and every side effect is appended to
//! an event log so tests can check ordering.
//!
//! ## Firmware Model
//!
//! | Call | Answer |
//! |------|--------|
//! | legacy putchar | byte captured, success |
//! | legacy getchar | next queued input byte, or -1 |
//! | base spec version | 2.0 |
//! | base impl id / version | OpenSBI / 1.4 |
//! | base probe | 1 unless removed with [`MockHart::without_extension`] |
//! | anything else | success, value 0 |
//!
//! Explicit answers registered with [`MockHart::respond`] take precedence.
//! [`Hart::halt`] panics with `"hart halted"`; tests observe it through
//! `std::panic::catch_unwind`.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::arch::riscv64::core::csr::{Csr, TrapCause};
use crate::arch::riscv64::hart::Hart;
use crate::arch::riscv64::sbi::{base_fid, eid, SbiCall, SbiRet};

/// Panic message raised by [`MockHart::halt`]
pub const HALT_MESSAGE: &str = "hart halted";

/// One observable side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HartEvent {
    /// `csrw`
    CsrWrite { csr: Csr, value: u64 },
    /// `csrs`
    CsrSet { csr: Csr, bits: u64 },
    /// `csrc`
    CsrClear { csr: Csr, bits: u64 },
    /// `sfence.vma`
    SfenceVma,
    /// `ecall`
    Ecall { extension_id: u64, function_id: u64 },
    /// `wfi`
    WaitForInterrupt,
    /// Terminal halt
    Halt,
}

/// Host-side hart with a recording firmware model
#[derive(Debug)]
pub struct MockHart {
    csrs: [u64; Csr::COUNT],
    time: Cell<u64>,
    time_step: u64,
    events: Vec<HartEvent>,
    calls: Vec<SbiCall>,
    console: Vec<u8>,
    input: VecDeque<u8>,
    responses: BTreeMap<(u64, u64), SbiRet>,
    missing_extensions: Vec<u64>,
    halted: bool,
}

impl MockHart {
    /// Spec version reported by the model (2.0)
    pub const SPEC_VERSION: u64 = 2 << 24;
    /// Implementation id reported by the model (OpenSBI)
    pub const IMPL_ID: u64 = 1;
    /// Implementation version reported by the model
    pub const IMPL_VERSION: u64 = 0x0001_0004;

    /// A hart with every CSR zero and a clock that advances by one per read
    pub fn new() -> Self {
        Self {
            csrs: [0; Csr::COUNT],
            time: Cell::new(0),
            time_step: 1,
            events: Vec::new(),
            calls: Vec::new(),
            console: Vec::new(),
            input: VecDeque::new(),
            responses: BTreeMap::new(),
            missing_extensions: Vec::new(),
            halted: false,
        }
    }

    /// Advance the clock by `step` on every `time` read
    pub fn with_time_step(mut self, step: u64) -> Self {
        self.time_step = step;
        self
    }

    /// Make `probe_extension` report `extension_id` as absent
    pub fn without_extension(mut self, extension_id: u64) -> Self {
        self.missing_extensions.push(extension_id);
        self
    }

    /// Answer every future call to `(extension_id, function_id)` with `ret`
    pub fn respond(&mut self, extension_id: u64, function_id: u64, ret: SbiRet) {
        self.responses.insert((extension_id, function_id), ret);
    }

    /// Queue console input
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Set the clock
    pub fn set_time(&mut self, now: u64) {
        self.time.set(now);
    }

    /// Load scause, sepc and stval as hardware does on trap entry
    pub fn raise(&mut self, cause: u64, pc: u64, value: u64) {
        self.csrs[Csr::Scause.index()] = cause;
        self.csrs[Csr::Sepc.index()] = pc;
        self.csrs[Csr::Stval.index()] = value;
    }

    /// Load the trap CSRs from a decoded cause
    pub fn raise_cause(&mut self, cause: TrapCause, pc: u64, value: u64) {
        self.raise(cause.to_scause(), pc, value);
    }

    /// Current CSR value without touching the clock
    pub fn csr(&self, csr: Csr) -> u64 {
        if csr == Csr::Time {
            self.time.get()
        } else {
            self.csrs[csr.index()]
        }
    }

    /// Side effects in program order
    pub fn events(&self) -> &[HartEvent] {
        &self.events
    }

    /// Every firmware call in program order
    pub fn sbi_calls(&self) -> &[SbiCall] {
        &self.calls
    }

    /// Number of calls into one extension
    pub fn calls_to(&self, extension_id: u64) -> usize {
        self.calls
            .iter()
            .filter(|call| call.extension_id == extension_id)
            .count()
    }

    /// Number of power-off requests (SRST shutdown or legacy shutdown)
    pub fn shutdown_requests(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                call.extension_id == eid::LEGACY_SHUTDOWN
                    || (call.extension_id == eid::SRST && call.function_id == 0 && call.args[0] == 0)
            })
            .count()
    }

    /// Number of writes to one CSR
    pub fn writes_to(&self, csr: Csr) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, HartEvent::CsrWrite { csr: c, .. } if *c == csr))
            .count()
    }

    /// Position of the first event matching `predicate`
    pub fn position(&self, predicate: impl Fn(&HartEvent) -> bool) -> Option<usize> {
        self.events.iter().position(predicate)
    }

    /// Console bytes as text
    pub fn console_output(&self) -> String {
        String::from_utf8_lossy(&self.console).into_owned()
    }

    /// Raw console bytes
    pub fn console_bytes(&self) -> &[u8] {
        &self.console
    }

    /// Whether [`Hart::halt`] has been reached
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn firmware(&mut self, call: &SbiCall) -> SbiRet {
        if let Some(ret) = self.responses.get(&(call.extension_id, call.function_id)) {
            return *ret;
        }

        match (call.extension_id, call.function_id) {
            (eid::LEGACY_CONSOLE_PUTCHAR, _) => {
                self.console.push(call.args[0] as u8);
                SbiRet::success(0)
            }
            (eid::LEGACY_CONSOLE_GETCHAR, _) => match self.input.pop_front() {
                Some(byte) => SbiRet {
                    error: i64::from(byte),
                    value: 0,
                },
                None => SbiRet { error: -1, value: 0 },
            },
            (eid::BASE, base_fid::GET_SPEC_VERSION) => SbiRet::success(Self::SPEC_VERSION),
            (eid::BASE, base_fid::GET_IMPL_ID) => SbiRet::success(Self::IMPL_ID),
            (eid::BASE, base_fid::GET_IMPL_VERSION) => SbiRet::success(Self::IMPL_VERSION),
            (eid::BASE, base_fid::PROBE_EXTENSION) => {
                let present = !self.missing_extensions.contains(&call.args[0]);
                SbiRet::success(u64::from(present))
            }
            _ => SbiRet::success(0),
        }
    }
}

impl Default for MockHart {
    fn default() -> Self {
        Self::new()
    }
}

impl Hart for MockHart {
    fn read_csr(&self, csr: Csr) -> u64 {
        if csr == Csr::Time {
            let now = self.time.get();
            self.time.set(now.wrapping_add(self.time_step));
            now
        } else {
            self.csrs[csr.index()]
        }
    }

    fn write_csr(&mut self, csr: Csr, value: u64) {
        if csr.is_read_only() {
            return;
        }
        self.csrs[csr.index()] = value;
        self.events.push(HartEvent::CsrWrite { csr, value });
    }

    fn set_csr_bits(&mut self, csr: Csr, bits: u64) {
        if csr.is_read_only() {
            return;
        }
        self.csrs[csr.index()] |= bits;
        self.events.push(HartEvent::CsrSet { csr, bits });
    }

    fn clear_csr_bits(&mut self, csr: Csr, bits: u64) {
        if csr.is_read_only() {
            return;
        }
        self.csrs[csr.index()] &= !bits;
        self.events.push(HartEvent::CsrClear { csr, bits });
    }

    fn sfence_vma(&mut self) {
        self.events.push(HartEvent::SfenceVma);
    }

    fn ecall(&mut self, call: &SbiCall) -> SbiRet {
        self.calls.push(*call);
        self.events.push(HartEvent::Ecall {
            extension_id: call.extension_id,
            function_id: call.function_id,
        });
        self.firmware(call)
    }

    fn wait_for_interrupt(&mut self) {
        self.events.push(HartEvent::WaitForInterrupt);
    }

    fn halt(&mut self) -> ! {
        self.halted = true;
        self.events.push(HartEvent::Halt);
        panic!("{}", HALT_MESSAGE)
    }
}
