use core::{
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
};

use crate::CpuOps;

/// A spinlock that masks local interrupts while it is held.
///
/// Anything that is also touched from exception context (the PHT refill path
/// runs with external interrupts off) must be taken through this lock by
/// ordinary code, otherwise a refill on the same core could spin forever on
/// a lock its own interrupted context holds.
pub struct SpinLockIrq<T: ?Sized, C: CpuOps> {
    _cpu: PhantomData<fn() -> C>,
    inner: spin::Mutex<T>,
}

impl<T, C: CpuOps> SpinLockIrq<T, C> {
    pub const fn new(data: T) -> Self {
        Self {
            _cpu: PhantomData,
            inner: spin::Mutex::new(data),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized, C: CpuOps> SpinLockIrq<T, C> {
    /// Disables interrupts, then spins until the lock is acquired.
    pub fn lock_save_irq(&self) -> SpinLockIrqGuard<'_, T, C> {
        let flags = C::disable_interrupts();

        SpinLockIrqGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            flags,
            _cpu: PhantomData,
        }
    }

    /// Attempts to take the lock without spinning. The interrupt state is left
    /// untouched when the lock is contended.
    pub fn try_lock_save_irq(&self) -> Option<SpinLockIrqGuard<'_, T, C>> {
        let flags = C::disable_interrupts();

        match self.inner.try_lock() {
            Some(guard) => Some(SpinLockIrqGuard {
                guard: ManuallyDrop::new(guard),
                flags,
                _cpu: PhantomData,
            }),
            None => {
                C::restore_interrupt_state(flags);
                None
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

pub struct SpinLockIrqGuard<'a, T: ?Sized, C: CpuOps> {
    guard: ManuallyDrop<spin::MutexGuard<'a, T>>,
    flags: usize,
    _cpu: PhantomData<fn() -> C>,
}

impl<T: ?Sized, C: CpuOps> Deref for SpinLockIrqGuard<'_, T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: ?Sized, C: CpuOps> DerefMut for SpinLockIrqGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: ?Sized, C: CpuOps> Drop for SpinLockIrqGuard<'_, T, C> {
    fn drop(&mut self) {
        // SAFETY: the guard is dropped exactly once, here, and never touched
        // again afterwards.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        C::restore_interrupt_state(self.flags);
    }
}

/// Keeps local interrupts masked for as long as it is alive.
pub struct IrqGuard<C: CpuOps> {
    flags: usize,
    _cpu: PhantomData<fn() -> C>,
}

impl<C: CpuOps> IrqGuard<C> {
    pub fn new() -> Self {
        Self {
            flags: C::disable_interrupts(),
            _cpu: PhantomData,
        }
    }
}

impl<C: CpuOps> Default for IrqGuard<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CpuOps> Drop for IrqGuard<C> {
    fn drop(&mut self) {
        C::restore_interrupt_state(self.flags);
    }
}
