//! Fatal lock conditions.
//!
//! Nothing here is recoverable. By the time an owner check fails or a waiter
//! spins out, the kernel's locking invariants are already broken, so these are
//! reported and handed to a handler that does not return.

use core::fmt;

use crate::platform::CpuId;

/// Which operation was called by a CPU that does not hold the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MisuseKind {
    Release,
    ReleaseAll,
    ReleaseAllButOne,
}

impl MisuseKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MisuseKind::Release => "release",
            MisuseKind::ReleaseAll => "release_all",
            MisuseKind::ReleaseAllButOne => "release_all_but_one",
        }
    }
}

/// A lock failure detected by the diagnostic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalLockError {
    /// `op` was called on `cpu`, but the lock belongs to `owner`.
    Misuse {
        lock: usize,
        op: MisuseKind,
        cpu: CpuId,
        owner: Option<CpuId>,
    },
    /// `cpu` waited `spins` iterations and the lock never cleared.
    SpinOut {
        lock: usize,
        cpu: CpuId,
        owner: Option<CpuId>,
        spins: usize,
    },
}

impl FatalLockError {
    /// Address of the lock involved.
    pub const fn lock(&self) -> usize {
        match *self {
            FatalLockError::Misuse { lock, .. } | FatalLockError::SpinOut { lock, .. } => lock,
        }
    }

    /// The CPU that detected the failure.
    pub const fn cpu(&self) -> CpuId {
        match *self {
            FatalLockError::Misuse { cpu, .. } | FatalLockError::SpinOut { cpu, .. } => cpu,
        }
    }
}

struct Owner(Option<CpuId>);

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(cpu) => write!(f, "{}", cpu),
            None => f.write_str("none"),
        }
    }
}

impl fmt::Display for FatalLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FatalLockError::Misuse { lock, op, cpu, owner } => write!(
                f,
                "mplock({:#x}): {} of lock not held by {} (owner {})",
                lock,
                op.as_str(),
                cpu,
                Owner(owner)
            ),
            FatalLockError::SpinOut { lock, cpu, owner, spins } => write!(
                f,
                "mplock({:#x}): lock spun out on {} after {} spins (owner {})",
                lock,
                cpu,
                spins,
                Owner(owner)
            ),
        }
    }
}

impl core::error::Error for FatalLockError {}

/// Called with interrupts in whatever state the failing operation left them.
/// Must not return: enter a debugger, panic, or halt.
pub type FatalHandler = fn(&FatalLockError) -> !;

/// Handler used when a lock is not given one: log the diagnostic, then
/// panic with it.
pub fn default_fatal_handler(err: &FatalLockError) -> ! {
    log::error!("{}", err);
    panic!("{}", err)
}
