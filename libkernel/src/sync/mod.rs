pub mod spinlock;

pub use spinlock::{IrqGuard, SpinLockIrq, SpinLockIrqGuard};
