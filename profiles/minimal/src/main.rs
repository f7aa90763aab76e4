//! # Sable Minimal Kernel
//!
//! Single-hart S-mode image: firmware hand-off, identity-mapped paging,
//! trap vector, optional SBI self-test, idle, power-off.
//!
//! Build with `--target riscv64gc-unknown-none-elf` and run under any SBI
//! firmware, e.g. `qemu-system-riscv64 -machine virt -bios default -kernel`.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_os = "none", target_arch = "riscv64"))]
mod kernel;

#[cfg(all(target_os = "none", not(target_arch = "riscv64")))]
compile_error!("sable-minimal only supports riscv64 bare-metal targets");

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!(
        "sable-minimal {} is a bare-metal image; build it with --target riscv64gc-unknown-none-elf",
        sable_early_boot::VERSION
    );
    std::process::exit(1);
}
