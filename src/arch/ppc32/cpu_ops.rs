use libkernel::CpuOps;

use super::{
    Ppc32,
    registers::{self, Msr},
};

impl CpuOps for Ppc32 {
    fn id() -> usize {
        // Secondary processors are never started.
        0
    }

    fn halt() -> ! {
        loop {
            #[cfg(target_arch = "powerpc")]
            registers::set_msr(registers::msr() | Msr::POW);

            #[cfg(not(target_arch = "powerpc"))]
            core::hint::spin_loop();
        }
    }

    #[inline(always)]
    fn enable_interrupts() {
        registers::set_msr(registers::msr() | Msr::EE);
    }

    #[inline(always)]
    fn disable_interrupts() -> usize {
        let msr = registers::msr();
        registers::set_msr(msr - Msr::EE);
        msr.bits() as usize
    }

    #[inline(always)]
    fn restore_interrupt_state(flags: usize) {
        let msr = registers::msr();
        if Msr::from_bits_retain(flags as u32).contains(Msr::EE) {
            registers::set_msr(msr | Msr::EE);
        } else {
            registers::set_msr(msr - Msr::EE);
        }
    }
}
