//! Simulated CPUs for driving `MpLock` from host threads.
//!
//! Each test thread binds itself to a CPU id. The interrupt mask is a
//! per-thread flag, and fatal errors are recorded per thread before the
//! handler panics, so tests can run in parallel without sharing state.

#![allow(dead_code)]

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use mplock::{FatalLockError, LockConfig, MpLock, Platform};

thread_local! {
    static CPU: Cell<usize> = const { Cell::new(0) };
    static MASKED: Cell<bool> = const { Cell::new(false) };
    static LAST_FATAL: Cell<Option<FatalLockError>> = const { Cell::new(None) };
}

pub struct SimCpu;

impl SimCpu {
    /// Makes the calling thread behave as CPU `id`.
    pub fn bind(id: usize) {
        CPU.with(|c| c.set(id));
    }

    pub fn current() -> mplock::CpuId {
        <SimCpu as Platform>::current_cpu()
    }

    pub fn masked() -> bool {
        MASKED.with(Cell::get)
    }
}

impl Platform for SimCpu {
    type IrqState = bool;

    fn current_cpu() -> mplock::CpuId {
        mplock::CpuId::new(CPU.with(Cell::get))
    }

    fn mask_interrupts() -> bool {
        MASKED.with(|m| m.replace(true))
    }

    fn restore_interrupts(state: bool) {
        MASKED.with(|m| m.set(state));
    }

    fn spin_hint() {
        std::thread::yield_now();
    }
}

/// Fatal handler standing in for the kernel debugger.
pub fn record_and_panic(err: &FatalLockError) -> ! {
    LAST_FATAL.with(|f| f.set(Some(*err)));
    panic!("{}", err)
}

pub fn diagnostic_lock() -> MpLock<SimCpu> {
    MpLock::with_config(
        LockConfig::DEFAULT
            .with_checks(mplock::Checks::all())
            .with_handler(record_and_panic),
    )
}

/// Runs `f`, expecting it to hit the fatal path on this thread.
pub fn expect_fatal<F: FnOnce()>(f: F) -> FatalLockError {
    LAST_FATAL.with(|c| c.set(None));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    assert!(result.is_err(), "operation returned normally");
    LAST_FATAL
        .with(Cell::get)
        .expect("panicked without reporting a lock error")
}
