//! Architecture-described kernel building blocks for the ppc32 hashed MMU.
//!
//! Everything in here is written against small collaborator traits so the
//! refill path can be exercised on the host; the kernel crate supplies the
//! hardware-backed implementations.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod error;
pub mod memory;
pub mod symtab;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

/// Operations on the local CPU that generic code is allowed to perform.
pub trait CpuOps: 'static {
    /// Returns the id of the executing CPU.
    fn id() -> usize;

    /// Stops the executing CPU. Never returns.
    fn halt() -> !;

    /// Masks external interrupts, returning the previous state so it can be
    /// handed back to [`CpuOps::restore_interrupt_state`].
    fn disable_interrupts() -> usize;

    /// Restores an interrupt state previously returned by
    /// [`CpuOps::disable_interrupts`].
    fn restore_interrupt_state(flags: usize);

    /// Unmasks external interrupts.
    fn enable_interrupts();
}
