//! Per-lock diagnostic configuration.

use core::fmt;

use bitflags::bitflags;

use crate::error::{FatalHandler, default_fatal_handler};

/// Spin iterations a waiter may burn before the lock is declared stuck.
pub const DEFAULT_SPINOUT: usize = 200_000_000;

/// Whether this build turns diagnostics on by default.
pub const DIAGNOSTICS: bool = cfg!(any(debug_assertions, feature = "lockdebug"));

bitflags! {
    /// Diagnostic checks a lock performs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Checks: u8 {
        /// Release operations verify that the caller owns the lock.
        const OWNER = 1 << 0;
        /// Waiters give up after `LockConfig::spinout` iterations.
        const SPINOUT = 1 << 1;
    }
}

/// How a lock diagnoses misuse and deadlock.
#[derive(Clone, Copy)]
pub struct LockConfig {
    /// Spin bound, only consulted when `Checks::SPINOUT` is set.
    pub spinout: usize,
    pub checks: Checks,
    /// Reports fatal conditions and never returns.
    pub on_fatal: FatalHandler,
}

impl LockConfig {
    pub const DEFAULT: Self = Self {
        spinout: DEFAULT_SPINOUT,
        checks: if DIAGNOSTICS { Checks::all() } else { Checks::empty() },
        on_fatal: default_fatal_handler,
    };

    /// # Panics
    /// A bound of 0 would declare every contended lock stuck.
    pub const fn with_spinout(mut self, spins: usize) -> Self {
        assert!(spins > 0, "LockConfig: spin-out bound must be non-zero");
        self.spinout = spins;
        self
    }

    pub const fn with_checks(mut self, checks: Checks) -> Self {
        self.checks = checks;
        self
    }

    pub const fn with_handler(mut self, handler: FatalHandler) -> Self {
        self.on_fatal = handler;
        self
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for LockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockConfig")
            .field("spinout", &self.spinout)
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}
