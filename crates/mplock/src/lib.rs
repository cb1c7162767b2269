// =============================================================================
// MinimalOS NextGen — Recursive Multiprocessor Lock
// =============================================================================
//
// `MpLock` serializes entry into kernel code across CPUs. Unlike a plain
// spinlock, the CPU that holds it may take it again (directly, or
// indirectly through a callback into the same subsystem) without deadlocking
// on itself. Every nested acquisition is counted and needs a matching release.
//
// STATE ENCODING:
//   count == 0        FREE, owner is "no owner"
//   count == 1        CLAIMED, only inside acquire() on the CPU that just won
//                     the CAS (and briefly inside the last release)
//   count == d + 1    HELD at nesting depth d by `owner`
//
//   The +1 baseline means both "last release" and "first acquire" are plain
//   decrement/increment steps that pass through 1; the CAS from 0 to 1 is the
//   only operation that races with other CPUs.
//
// INTERRUPTS:
//   Every mutation of `count`/`owner` happens with local interrupts masked,
//   so an interrupt handler on the same CPU never sees a half-updated lock.
//   Waiting CPUs spin with interrupts restored.
//
// DIAGNOSTICS:
//   With debug assertions (or the `lockdebug` feature) each lock checks that
//   releases come from the owner and bounds how long a waiter may spin.
//   A failed check is fatal: it is handed to the lock's `FatalHandler`,
//   which reports it and never returns.
//
// =============================================================================

#![cfg_attr(not(test), no_std)]

mod config;
mod error;
mod lock;
mod platform;

pub use config::{Checks, DEFAULT_SPINOUT, DIAGNOSTICS, LockConfig};
pub use error::{FatalHandler, FatalLockError, MisuseKind, default_fatal_handler};
pub use lock::{LockState, MpLock, MpLockGuard};
pub use platform::{CpuId, IrqGuard, Platform};
