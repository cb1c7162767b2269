//! `mplock::Platform` for x86_64 cores.

use mplock::{CpuId, Platform};

use crate::cpu;

/// An x86_64 core.
pub struct X86;

impl Platform for X86 {
    /// Whether interrupts were enabled before masking.
    type IrqState = bool;

    #[inline]
    fn current_cpu() -> CpuId {
        CpuId::new(cpu::core_id() as usize)
    }

    /// x86 has no interrupt priority levels for us to raise; clearing IF is
    /// "highest". Already-masked callers stay masked on restore.
    #[inline]
    fn mask_interrupts() -> bool {
        let was_enabled = cpu::interrupts_enabled();
        if was_enabled {
            cpu::disable_interrupts();
        }
        was_enabled
    }

    #[inline]
    fn restore_interrupts(was_enabled: bool) {
        if was_enabled {
            cpu::enable_interrupts();
        }
    }

    /// PAUSE: cuts power and avoids the memory-order pipeline flush when the
    /// lock word finally changes.
    #[inline(always)]
    fn spin_hint() {
        core::hint::spin_loop();
    }
}
