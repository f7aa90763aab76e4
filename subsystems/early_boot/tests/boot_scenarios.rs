//! End-to-end bring-up on a recording hart.

use std::alloc::{alloc_zeroed, Layout};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use sable_early_boot::info::CONFIG_BLOB_MAGIC;
use sable_early_boot::memory::TableSlot;
use sable_early_boot::{
    dispatch, BlobReader, BlobWindow, BootConfig, BootContext, BootSequence, ConfigBlobHeader, HartBootInfo,
    InterruptMask, PageTableArena, TrapState, TrapSubsystem, TrapTable,
};
use sable_hal::arch::riscv64::core::csr::exception;
use sable_hal::arch::riscv64::sbi::eid;
use sable_hal::mock::{HartEvent, MockHart};
use sable_hal::Csr;
use spin::Mutex;

const BLOB_BASE: u64 = 0x8220_0000;
const TRAP_ENTRY: u64 = 0x8020_0040;

fn arena() -> Box<PageTableArena> {
    let layout = Layout::new::<PageTableArena>();
    // SAFETY: an all-zero arena is a set of empty tables.
    unsafe {
        let ptr = alloc_zeroed(layout) as *mut PageTableArena;
        assert!(!ptr.is_null());
        Box::from_raw(ptr)
    }
}

fn header() -> ConfigBlobHeader {
    ConfigBlobHeader {
        magic: CONFIG_BLOB_MAGIC,
        total_size: 0x1f00,
        struct_offset: 0x40,
        strings_offset: 0x1c00,
        mem_rsvmap_offset: 0x30,
        version: 17,
        last_compatible_version: 16,
        boot_cpuid: 0,
        strings_size: 0x300,
    }
}

/// Counts every header read
struct CountingReader<'a> {
    inner: BlobWindow<'a>,
    reads: Cell<usize>,
}

impl BlobReader for CountingReader<'_> {
    fn read_header(&self, address: u64) -> Option<[u8; ConfigBlobHeader::SIZE]> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_header(address)
    }
}

struct Boot {
    hart: MockHart,
    arena: Box<PageTableArena>,
    traps: Mutex<TrapSubsystem>,
    reads: usize,
}

fn boot(hart_id: u64, address: u64, config: BootConfig, mut hart: MockHart) -> Boot {
    let bytes = header().to_be_bytes();
    let reader = CountingReader {
        inner: BlobWindow::new(BLOB_BASE, &bytes),
        reads: Cell::new(0),
    };
    let ctx = BootContext::new(HartBootInfo::new(hart_id, address), config);
    let mut arena = arena();
    let traps = Mutex::new(TrapSubsystem::new(TrapTable::all_fatal()));

    let result = catch_unwind(AssertUnwindSafe(|| {
        BootSequence::new(&ctx, &mut hart).run(&reader, &mut arena, &traps, TRAP_ENTRY)
    }));
    assert!(result.is_err(), "boot sequence must end in halt");
    assert!(hart.is_halted());

    Boot {
        hart,
        arena,
        traps,
        reads: reader.reads.get(),
    }
}

fn error_lines(trace: &str) -> Vec<&str> {
    trace.lines().filter(|line| line.contains("ERROR")).collect()
}

#[test]
fn test_valid_boot_runs_to_shutdown() {
    let run = boot(0, BLOB_BASE, BootConfig::new().with_idle_ticks(100), MockHart::new());
    let trace = run.hart.console_output();

    assert!(trace.contains("[boot] hart 0\r\n"));
    assert!(trace.contains("[validate] hart_id=0 ok"));
    assert!(error_lines(&trace).is_empty(), "unexpected errors:\n{}", trace);
    assert!(trace.contains("[boot] paging on: Sv39"));
    assert!(trace.contains("[selftest] SBI spec 2.0"));
    assert!(trace.contains("bring-up complete"));

    let satp = run.hart.csr(Csr::Satp);
    assert_eq!(satp >> 60, 8);
    assert_eq!(satp & ((1 << 44) - 1), run.arena.table_ppn(TableSlot::ROOT).unwrap());
    assert_eq!(run.hart.csr(Csr::Stvec), TRAP_ENTRY);
    assert_eq!(run.traps.lock().state(), TrapState::Configured);
    assert_eq!(run.hart.shutdown_requests(), 1);
    assert_eq!(run.reads, 1);
}

#[test]
fn test_boot_stage_order() {
    let run = boot(0, BLOB_BASE, BootConfig::quiet(), MockHart::new());
    let hart = &run.hart;

    let satp = hart
        .position(|e| matches!(e, HartEvent::CsrWrite { csr: Csr::Satp, .. }))
        .unwrap();
    let stvec = hart
        .position(|e| matches!(e, HartEvent::CsrWrite { csr: Csr::Stvec, .. }))
        .unwrap();
    let sie = hart
        .position(|e| matches!(e, HartEvent::CsrSet { csr: Csr::Sstatus, .. }))
        .unwrap();
    let shutdown = hart
        .position(|e| matches!(e, HartEvent::Ecall { extension_id: eid::SRST, function_id: 0 }))
        .unwrap();

    assert!(matches!(hart.events()[satp - 1], HartEvent::SfenceVma));
    assert!(matches!(hart.events()[satp + 1], HartEvent::SfenceVma));
    assert!(satp < stvec);
    assert!(stvec < sie);
    assert!(sie < shutdown);
    assert_eq!(hart.writes_to(Csr::Satp), 1);
}

#[test]
fn test_timer_cleared_before_interrupts_enabled() {
    let run = boot(0, BLOB_BASE, BootConfig::quiet(), MockHart::new());
    let hart = &run.hart;

    let timer = hart
        .position(|e| matches!(e, HartEvent::Ecall { extension_id: eid::TIME, .. }))
        .unwrap();
    let sie = hart
        .position(|e| matches!(e, HartEvent::CsrSet { csr: Csr::Sstatus, .. }))
        .unwrap();
    assert!(timer < sie);

    let run = boot(
        0,
        BLOB_BASE,
        BootConfig::quiet().with_interrupts(InterruptMask::EXTERNAL),
        MockHart::new(),
    );
    assert_eq!(run.hart.calls_to(eid::TIME), 0);
}

#[test]
fn test_hart_id_out_of_range_halts_before_paging() {
    let run = boot(17, BLOB_BASE, BootConfig::new(), MockHart::new());
    let trace = run.hart.console_output();

    assert!(trace.contains("[validate] hart_id=17 ERROR: hart id 17 out of range"));
    assert!(trace.contains("[boot] ERROR: invalid boot parameters"));
    assert!(!trace.contains("[selftest]"));
    assert_eq!(run.hart.writes_to(Csr::Satp), 0);
    assert_eq!(run.hart.writes_to(Csr::Stvec), 0);
    assert_eq!(run.arena.table(TableSlot::ROOT).unwrap().valid_count(), 0);
    assert_eq!(run.traps.lock().state(), TrapState::Uninitialized);
    assert_eq!(run.hart.shutdown_requests(), 1);
    assert_eq!(run.reads, 0);
}

#[test]
fn test_misaligned_blob_rejected_without_reading() {
    let run = boot(0, 0x1001, BootConfig::new(), MockHart::new());
    let trace = run.hart.console_output();

    assert!(trace.contains("[validate] hart_id=0 ok"));
    assert!(trace.contains("[validate] config_blob=0x1001 present ok"));
    assert!(trace.contains("ERROR: configuration blob at 0x1001 is not 4-byte aligned"));
    assert_eq!(run.reads, 0);
    assert_eq!(run.hart.writes_to(Csr::Satp), 0);
    assert_eq!(run.hart.shutdown_requests(), 1);
}

#[test]
fn test_legacy_shutdown_without_srst() {
    let run = boot(0, BLOB_BASE, BootConfig::quiet(), MockHart::new().without_extension(eid::SRST));

    assert_eq!(run.hart.calls_to(eid::LEGACY_SHUTDOWN), 1);
    assert_eq!(run.hart.shutdown_requests(), 1);
}

#[test]
fn test_illegal_instruction_is_fatal() {
    let run = boot(0, BLOB_BASE, BootConfig::quiet(), MockHart::new());
    let traps = run.traps;

    // Fresh hart carrying the configured trap state, as after bring-up
    let mut hart = MockHart::new();
    traps
        .lock()
        .install_vector_and_enable(&mut hart, TRAP_ENTRY, InterruptMask::all())
        .unwrap();
    hart.raise(exception::ILLEGAL_INSTRUCTION, 0x8020_3000, 0xdead_beef);

    let result = catch_unwind(AssertUnwindSafe(|| dispatch(&mut hart, &traps)));
    assert!(result.is_err());

    let trace = hart.console_output();
    assert!(trace.contains("[trap] FATAL Illegal Instruction"));
    assert!(trace.contains("scause=0x0000000000000002"));
    assert!(trace.contains("sepc=0x0000000080203000"));
    assert!(trace.contains("stval=0x00000000deadbeef"));
    assert_eq!(hart.shutdown_requests(), 1);
    assert!(hart.is_halted());
    assert_eq!(traps.lock().state(), TrapState::Terminal);
}
