// =============================================================================
// MinimalOS NextGen — Big Kernel Lock
// =============================================================================
//
// One recursive MpLock serializing kernel entry across all cores. It is
// created at compile time, never destroyed, and lives exactly as long as the
// kernel does.
//
// Code that must block or switch context while holding it gives it up with
// `kernel_release_all()` and takes it back with `kernel_acquire_count(n)`.
//
// A spun-out waiter or an unlock from the wrong core is a kernel bug. Both
// are written straight to COM1, without the port lock the logger takes, and
// then trap into the debugger on the core that noticed.
// =============================================================================

use mplock::{FatalLockError, LockConfig, MpLock};

use crate::cpu;
use crate::platform::X86;
use crate::serial;

/// The big kernel lock.
pub static KERNEL_LOCK: MpLock<X86> =
    MpLock::with_config(LockConfig::DEFAULT.with_handler(enter_debugger));

#[inline]
pub fn kernel_lock() {
    KERNEL_LOCK.acquire();
}

#[inline]
pub fn kernel_unlock() {
    KERNEL_LOCK.release();
}

#[inline]
pub fn kernel_lock_held() -> bool {
    KERNEL_LOCK.held_by_current()
}

/// Drops the kernel lock completely. Returns the depth to hand back to
/// `kernel_acquire_count` afterwards.
pub fn kernel_release_all() -> usize {
    KERNEL_LOCK.release_all()
}

pub fn kernel_acquire_count(n: usize) {
    KERNEL_LOCK.acquire_count(n);
}

/// Fatal handler for kernel locks: report on the raw port, break into the
/// debugger, and halt the core if the debugger returns.
pub fn enter_debugger(err: &FatalLockError) -> ! {
    serial::write_fmt_unlocked(format_args!(
        "\n*** {} ***\n*** core {}: entering debugger ***\n",
        err,
        cpu::core_id()
    ));
    cpu::breakpoint();

    serial::write_fmt_unlocked(format_args!(
        "*** core {}: halted after lock failure ***\n",
        cpu::core_id()
    ));
    cpu::halt_forever()
}
