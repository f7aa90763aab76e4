//! Entry, trap stub and panic handler for the bare-metal image.

use core::arch::global_asm;
use core::fmt::Write;
use core::panic::PanicInfo;

use log::LevelFilter;
use sable_early_boot::{
    dispatch, BootConfig, BootContext, BootSequence, ConsoleLogger, DirectMemory, HartBootInfo,
    PageTableArena, TrapSubsystem, TrapTable,
};
use sable_hal::arch::riscv64::core::csr::status;
use sable_hal::arch::riscv64::privilege::CallerSavedFrame;
use sable_hal::arch::riscv64::sbi::{self, ResetReason, SbiConsole};
use sable_hal::arch::riscv64::Riscv64Hart;
use spin::Mutex;

const CONFIG: BootConfig = BootConfig::new();

/// Boot page tables; zeroed with the rest of `.bss`
static ARENA: Mutex<PageTableArena> = Mutex::new(PageTableArena::new());

static TRAPS: Mutex<TrapSubsystem> = Mutex::new(TrapSubsystem::new(TrapTable::all_fatal()));

static LOGGER: ConsoleLogger = ConsoleLogger::new(firmware_putchar, LevelFilter::Info);

// Firmware enters here in S-mode with a0 = hart id, a1 = config blob.
// a0 and a1 must survive until kernel_main.
global_asm!(
    r#"
    .section .text.entry
    .globl _start
_start:
    csrw    sie, zero
    csrci   sstatus, 0x2
    li      t0, {fs_initial}
    csrs    sstatus, t0
    la      sp, __stack_top

    la      t0, __bss_start
    la      t1, __bss_end
1:
    bgeu    t0, t1, 2f
    sd      zero, 0(t0)
    addi    t0, t0, 8
    j       1b
2:
    call    kernel_main
3:
    wfi
    j       3b

    .section .text
    .balign 4
    .globl sable_trap_entry
sable_trap_entry:
    addi    sp, sp, -{frame_size}
    sd      ra, 0(sp)
    sd      t0, 8(sp)
    sd      t1, 16(sp)
    sd      t2, 24(sp)
    sd      t3, 32(sp)
    sd      t4, 40(sp)
    sd      t5, 48(sp)
    sd      t6, 56(sp)
    sd      a0, 64(sp)
    sd      a1, 72(sp)
    sd      a2, 80(sp)
    sd      a3, 88(sp)
    sd      a4, 96(sp)
    sd      a5, 104(sp)
    sd      a6, 112(sp)
    sd      a7, 120(sp)
    addi    t0, sp, {fp_offset}
    fsd     ft0, 0(t0)
    fsd     ft1, 8(t0)
    fsd     ft2, 16(t0)
    fsd     ft3, 24(t0)
    fsd     ft4, 32(t0)
    fsd     ft5, 40(t0)
    fsd     ft6, 48(t0)
    fsd     ft7, 56(t0)
    fsd     ft8, 64(t0)
    fsd     ft9, 72(t0)
    fsd     ft10, 80(t0)
    fsd     ft11, 88(t0)
    fsd     fa0, 96(t0)
    fsd     fa1, 104(t0)
    fsd     fa2, 112(t0)
    fsd     fa3, 120(t0)
    fsd     fa4, 128(t0)
    fsd     fa5, 136(t0)
    fsd     fa6, 144(t0)
    fsd     fa7, 152(t0)

    call    sable_trap

    addi    t0, sp, {fp_offset}
    fld     ft0, 0(t0)
    fld     ft1, 8(t0)
    fld     ft2, 16(t0)
    fld     ft3, 24(t0)
    fld     ft4, 32(t0)
    fld     ft5, 40(t0)
    fld     ft6, 48(t0)
    fld     ft7, 56(t0)
    fld     ft8, 64(t0)
    fld     ft9, 72(t0)
    fld     ft10, 80(t0)
    fld     ft11, 88(t0)
    fld     fa0, 96(t0)
    fld     fa1, 104(t0)
    fld     fa2, 112(t0)
    fld     fa3, 120(t0)
    fld     fa4, 128(t0)
    fld     fa5, 136(t0)
    fld     fa6, 144(t0)
    fld     fa7, 152(t0)
    ld      ra, 0(sp)
    ld      t0, 8(sp)
    ld      t1, 16(sp)
    ld      t2, 24(sp)
    ld      t3, 32(sp)
    ld      t4, 40(sp)
    ld      t5, 48(sp)
    ld      t6, 56(sp)
    ld      a0, 64(sp)
    ld      a1, 72(sp)
    ld      a2, 80(sp)
    ld      a3, 88(sp)
    ld      a4, 96(sp)
    ld      a5, 104(sp)
    ld      a6, 112(sp)
    ld      a7, 120(sp)
    addi    sp, sp, {frame_size}
    sret
"#,
    fs_initial = const status::FS_INITIAL,
    frame_size = const CallerSavedFrame::SIZE,
    fp_offset = const CallerSavedFrame::FP_OFFSET,
);

extern "C" {
    fn sable_trap_entry();
}

fn firmware_putchar(byte: u8) {
    let _ = sbi::console_putchar(&mut Riscv64Hart, byte);
}

#[no_mangle]
extern "C" fn kernel_main(hart_id: u64, config_blob: u64) -> ! {
    let mut hart = Riscv64Hart;
    if LOGGER.install().is_err() {
        let _ = writeln!(SbiConsole::new(&mut hart), "[boot] logger already installed");
    }

    let ctx = BootContext::new(HartBootInfo::new(hart_id, config_blob), CONFIG);
    // SAFETY: paging is still off and firmware passes a readable blob in a1.
    let reader = unsafe { DirectMemory::new() };
    // Held for the rest of execution; satp points into it.
    let mut arena = ARENA.lock();

    BootSequence::new(&ctx, &mut hart).run(&reader, &mut arena, &TRAPS, sable_trap_entry as usize as u64)
}

#[no_mangle]
extern "C" fn sable_trap() {
    let mut hart = Riscv64Hart;
    let _ = dispatch(&mut hart, &TRAPS);
}

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    let mut hart = Riscv64Hart;
    {
        let mut console = SbiConsole::new(&mut hart);
        let _ = writeln!(console, "[panic] {}", info);
    }
    sbi::shutdown_with_reason(&mut hart, ResetReason::SystemFailure)
}
