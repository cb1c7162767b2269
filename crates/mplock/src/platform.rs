//! The architecture seam.
//!
//! A port provides three things: the identity of the CPU it is running on,
//! a way to mask local interrupts and put them back, and a spin hint.

use core::fmt;
use core::marker::PhantomData;

/// Raw owner value meaning "no CPU holds the lock".
pub(crate) const NO_OWNER: usize = usize::MAX;

/// Identity of one execution context (one per physical CPU).
///
/// The lock stores this as a plain number. It never owns or dereferences the
/// CPU descriptor it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(usize);

impl CpuId {
    /// Wraps a core index.
    ///
    /// # Panics
    /// `usize::MAX` is reserved for "no owner".
    pub const fn new(index: usize) -> Self {
        assert!(index != NO_OWNER, "CpuId: usize::MAX is reserved");
        Self(index)
    }

    /// The core index this id was built from.
    pub const fn index(self) -> usize {
        self.0
    }

    pub(crate) const fn raw(self) -> usize {
        self.0
    }

    pub(crate) const fn from_raw(raw: usize) -> Option<Self> {
        if raw == NO_OWNER { None } else { Some(Self(raw)) }
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Platform primitives the lock is built on.
///
/// All functions are associated (no receiver) so that an `MpLock<P>` can be
/// constructed in a `static`.
///
/// Every function must be callable with interrupts masked and must neither
/// block nor allocate.
pub trait Platform {
    /// Whatever is needed to put the interrupt level back exactly as it was.
    type IrqState: Copy;

    /// Identity of the calling CPU.
    fn current_cpu() -> CpuId;

    /// Raises the local CPU to "no interrupts" and returns the prior state.
    /// Nested calls must compose: restoring the inner state leaves the outer
    /// mask in place.
    fn mask_interrupts() -> Self::IrqState;

    /// Returns the local CPU to a state produced by `mask_interrupts`.
    fn restore_interrupts(state: Self::IrqState);

    /// Executed once per spin iteration. Never needed for correctness.
    #[inline(always)]
    fn spin_hint() {
        core::hint::spin_loop();
    }
}

/// Masks local interrupts for as long as it lives.
///
/// The prior level is restored on every exit path, including unwinding out of
/// a fatal diagnostic. Not `Send`: the state belongs to the CPU that saved it.
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard<P: Platform> {
    state: P::IrqState,
    _not_send: PhantomData<*const ()>,
}

impl<P: Platform> IrqGuard<P> {
    #[inline]
    pub fn new() -> Self {
        Self {
            state: P::mask_interrupts(),
            _not_send: PhantomData,
        }
    }
}

impl<P: Platform> Default for IrqGuard<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> Drop for IrqGuard<P> {
    #[inline]
    fn drop(&mut self) {
        P::restore_interrupts(self.state);
    }
}
