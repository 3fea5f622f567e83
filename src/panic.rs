//! The kernel's panic handler: every fatal path, including an unrecoverable
//! storage fault, ends here.

use core::fmt::Display;

use libkernel::CpuOps;
use log::error;

/// Masks interrupts on the local CPU, logs `msg` and parks the CPU.
pub fn halt_cpu<C: CpuOps>(msg: impl Display) -> ! {
    C::disable_interrupts();
    error!("Kernel panic on cpu {}: {msg}", C::id());
    C::halt()
}

#[cfg(all(feature = "arch-ppc32", target_arch = "powerpc", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    halt_cpu::<crate::arch::ArchImpl>(info)
}
