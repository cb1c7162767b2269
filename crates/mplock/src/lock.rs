// =============================================================================
// MinimalOS NextGen — MpLock
// =============================================================================
//
// Only two words of shared state: `count` and `owner`.
//
//   - `count` is claimed from FREE by a compare-and-swap. That CAS is the one
//     place CPUs race, and it alone decides who the next owner is.
//   - Once a CPU owns the lock, it changes `count` with plain loads and
//     stores. Nobody else writes it while `owner` names another CPU.
//   - `owner` is only written by the CPU that is, or is about to become, the
//     owner.
//
// ORDERING:
//   acquire: CAS 0 -> 1 (Acquire), then publish `owner` (Release) so the
//            claim is visible before the owner is.
//   release: fence(Release) after the critical section, clear `owner`, then
//            store 0 into `count` (Release). A waiter's successful CAS
//            (Acquire) therefore sees everything the previous owner wrote.
//
// FAIRNESS:
//   None. A waiter that keeps losing the CAS keeps spinning.
//
// =============================================================================

use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering, fence};

use crate::config::{Checks, LockConfig};
use crate::error::{FatalLockError, MisuseKind};
use crate::platform::{CpuId, IrqGuard, NO_OWNER, Platform};

const FREE: usize = 0;
const CLAIMED: usize = 1;
/// `count` of a lock held once.
const HELD_ONCE: usize = 2;

/// A recursive, interrupt-safe spinlock for kernel code running on several
/// CPUs.
///
/// Const-constructible so it can live in a `static`; the big kernel lock is
/// one such static. Holding it says nothing about data: it protects whatever
/// code the caller decides to run between `acquire` and `release`.
///
/// # Example
/// ```ignore
/// static SUBSYS_LOCK: MpLock<X86> = MpLock::new();
///
/// SUBSYS_LOCK.acquire();
/// callback();              // may call SUBSYS_LOCK.acquire() again
/// SUBSYS_LOCK.release();
/// ```
pub struct MpLock<P: Platform> {
    count: AtomicUsize,
    owner: AtomicUsize,
    config: LockConfig,
    _platform: PhantomData<fn() -> P>,
}

/// Snapshot of a lock, as seen from outside.
///
/// Racy by nature: by the time the caller looks at it, another CPU may have
/// moved the lock on. Use it for assertions and debugger dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    /// Between the winning CAS and the owner being published, or between the
    /// final decrement of a release and the lock being cleared.
    Claimed,
    Held { owner: CpuId, depth: usize },
}

impl<P: Platform> MpLock<P> {
    /// A free lock with the build's default diagnostics.
    pub const fn new() -> Self {
        Self::with_config(LockConfig::DEFAULT)
    }

    pub const fn with_config(config: LockConfig) -> Self {
        Self {
            count: AtomicUsize::new(FREE),
            owner: AtomicUsize::new(NO_OWNER),
            config,
            _platform: PhantomData,
        }
    }

    /// Resets the lock to FREE.
    ///
    /// Takes `&mut self`: a lock that another CPU could be holding cannot be
    /// re-initialised.
    pub fn init(&mut self) {
        *self.count.get_mut() = FREE;
        *self.owner.get_mut() = NO_OWNER;
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquires the lock, spinning while another CPU holds it.
    ///
    /// The calling CPU may already hold it; the nesting depth then grows by
    /// one. Every call must be matched by one `release`.
    pub fn acquire(&self) {
        loop {
            let me = {
                let _irq = IrqGuard::<P>::new();
                let me = P::current_cpu();

                if self
                    .count
                    .compare_exchange(FREE, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    self.owner.store(me.raw(), Ordering::Release);
                }

                // True if we just won the CAS, or if we already held the lock.
                if self.owner.load(Ordering::Relaxed) == me.raw() {
                    let count = self.count.load(Ordering::Relaxed);
                    self.count.store(count + 1, Ordering::Relaxed);
                    return;
                }
                me
            };

            self.spin(me);
        }
    }

    /// Acquires the lock `n` times. Restores a depth handed back by
    /// `release_all` or `release_all_but_one`.
    pub fn acquire_count(&self, n: usize) {
        for _ in 0..n {
            self.acquire();
        }
    }

    /// Acquires the lock and returns a guard that releases it once on drop.
    pub fn enter(&self) -> MpLockGuard<'_, P> {
        self.acquire();
        MpLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Drops one level of nesting. The outermost release frees the lock.
    pub fn release(&self) {
        let _irq = IrqGuard::<P>::new();
        self.check_owner(MisuseKind::Release);

        let count = self.count.load(Ordering::Relaxed) - 1;
        self.count.store(count, Ordering::Relaxed);
        if count == CLAIMED {
            self.clear();
        }
    }

    /// Gives the lock up entirely and returns the nesting depth that was
    /// held, for a later `acquire_count`.
    pub fn release_all(&self) -> usize {
        let _irq = IrqGuard::<P>::new();
        self.check_owner(MisuseKind::ReleaseAll);

        let depth = self.count.load(Ordering::Relaxed) - 1;
        self.clear();
        depth
    }

    /// Drops every level of nesting but the outermost one and returns how
    /// many were dropped.
    pub fn release_all_but_one(&self) -> usize {
        let _irq = IrqGuard::<P>::new();
        self.check_owner(MisuseKind::ReleaseAllButOne);

        let extra = self.count.load(Ordering::Relaxed) - HELD_ONCE;
        self.count.store(HELD_ONCE, Ordering::Relaxed);
        extra
    }

    /// Whether the calling CPU holds the lock.
    #[inline]
    pub fn held_by_current(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == P::current_cpu().raw()
    }

    /// Nesting depth if the calling CPU holds the lock, otherwise 0.
    pub fn depth(&self) -> usize {
        if self.held_by_current() {
            self.count.load(Ordering::Relaxed) - 1
        } else {
            0
        }
    }

    pub fn state(&self) -> LockState {
        let count = self.count.load(Ordering::Acquire);
        let owner = CpuId::from_raw(self.owner.load(Ordering::Acquire));

        match (count, owner) {
            (FREE, _) => LockState::Free,
            (CLAIMED, _) | (_, None) => LockState::Claimed,
            (count, Some(owner)) => LockState::Held {
                owner,
                depth: count - 1,
            },
        }
    }

    /// FREE the lock. Interrupts must be masked.
    #[inline]
    fn clear(&self) {
        fence(Ordering::Release);
        self.owner.store(NO_OWNER, Ordering::Relaxed);
        self.count.store(FREE, Ordering::Release);
    }

    /// Waits, interrupts unmasked, until the lock looks free.
    fn spin(&self, me: CpuId) {
        if !self.config.checks.contains(Checks::SPINOUT) {
            while self.count.load(Ordering::Relaxed) != FREE {
                P::spin_hint();
            }
            return;
        }

        let mut ticks = self.config.spinout;
        loop {
            if self.count.load(Ordering::Relaxed) == FREE {
                return;
            }
            if ticks == 0 {
                break;
            }
            P::spin_hint();
            ticks -= 1;
        }

        self.fatal(FatalLockError::SpinOut {
            lock: self.addr(),
            cpu: me,
            owner: CpuId::from_raw(self.owner.load(Ordering::Relaxed)),
            spins: self.config.spinout,
        });
    }

    #[inline]
    fn check_owner(&self, op: MisuseKind) {
        if !self.config.checks.contains(Checks::OWNER) {
            return;
        }

        let cpu = P::current_cpu();
        let owner = self.owner.load(Ordering::Relaxed);
        if owner != cpu.raw() {
            self.fatal(FatalLockError::Misuse {
                lock: self.addr(),
                op,
                cpu,
                owner: CpuId::from_raw(owner),
            });
        }
    }

    /// The handler owns reporting: a kernel handler may need to bypass
    /// locks that the logger takes.
    #[cold]
    #[inline(never)]
    fn fatal(&self, err: FatalLockError) -> ! {
        (self.config.on_fatal)(&err)
    }

    fn addr(&self) -> usize {
        self as *const Self as usize
    }
}

impl<P: Platform> Default for MpLock<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> fmt::Debug for MpLock<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpLock")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// One level of an `MpLock`, released when dropped.
///
/// Not `Send`: it must be released on the CPU that acquired it.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct MpLockGuard<'a, P: Platform> {
    lock: &'a MpLock<P>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, P: Platform> MpLockGuard<'a, P> {
    pub fn lock(&self) -> &'a MpLock<P> {
        self.lock
    }
}

impl<P: Platform> Drop for MpLockGuard<'_, P> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
