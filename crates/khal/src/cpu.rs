//! Per-core primitives: interrupt flag, core identity, halting.
//!
//! These are the bottom of the lock's abstraction stack. They must never
//! block or allocate: `mplock` calls them with interrupts masked.

use core::arch::x86_64::__cpuid;

use x86_64::instructions::{self, interrupts};
use x86_64::registers::rflags::{self, RFlags};

/// Whether maskable interrupts are enabled on this core (RFLAGS.IF).
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    rflags::read().contains(RFlags::INTERRUPT_FLAG)
}

/// CLI. NMIs and machine checks still arrive.
#[inline(always)]
pub fn disable_interrupts() {
    interrupts::disable();
}

/// STI. The instruction after STI runs before any pending interrupt.
#[inline(always)]
pub fn enable_interrupts() {
    interrupts::enable();
}

/// Initial local APIC ID of the calling core, from CPUID leaf 1.
///
/// Unique per core and needs no per-core setup, so it is valid from the
/// first instruction on the BSP and on every AP.
#[inline]
pub fn core_id() -> u32 {
    // SAFETY: CPUID leaf 1 exists on every x86_64 processor.
    #[allow(unused_unsafe)]
    let leaf = unsafe { __cpuid(1) };
    leaf.ebx >> 24
}

/// Traps into the kernel debugger (#BP).
#[inline(always)]
pub fn breakpoint() {
    interrupts::int3();
}

/// Stops this core for good. Nothing can wake it.
pub fn halt_forever() -> ! {
    loop {
        interrupts::disable();
        instructions::hlt();
    }
}
