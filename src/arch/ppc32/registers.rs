//! Special-purpose register access.
//!
//! Off target the registers are modelled by a handful of atomics so the
//! glue above them can run in host tests.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Msr: u32 {
        /// Power management enable.
        const POW = 1 << 18;
        /// External interrupt enable.
        const EE = 1 << 15;
        /// Problem (user) state.
        const PR = 1 << 14;
        const IR = 1 << 5;
        const DR = 1 << 4;
    }
}

#[cfg(target_arch = "powerpc")]
mod hw {
    use core::arch::asm;

    #[inline(always)]
    pub fn read_msr() -> u32 {
        let msr: u32;
        unsafe { asm!("mfmsr {}", out(reg) msr, options(nomem, nostack, preserves_flags)) };
        msr
    }

    #[inline(always)]
    pub fn write_msr(msr: u32) {
        unsafe { asm!("mtmsr {}", "isync", in(reg) msr, options(nostack)) };
    }

    #[inline(always)]
    pub fn read_dar() -> u32 {
        let dar: u32;
        unsafe { asm!("mfspr {}, 19", out(reg) dar, options(nomem, nostack, preserves_flags)) };
        dar
    }

    /// Reads the segment register selected by the top nibble of `ea`.
    #[inline(always)]
    pub fn read_srin(ea: u32) -> u32 {
        let sr: u32;
        unsafe { asm!("mfsrin {}, {}", out(reg) sr, in(reg) ea, options(nomem, nostack, preserves_flags)) };
        sr
    }

    #[inline(always)]
    pub fn write_srin(ea: u32, sr: u32) {
        unsafe { asm!("mtsrin {}, {}", "isync", in(reg) sr, in(reg) ea, options(nostack)) };
    }

    pub fn write_sdr1(sdr1: u32) {
        unsafe { asm!("sync", "mtspr 25, {}", "isync", in(reg) sdr1, options(nostack)) };
    }
}

#[cfg(not(target_arch = "powerpc"))]
mod hw {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::Msr;

    static MSR: AtomicU32 = AtomicU32::new(Msr::EE.bits());
    static DAR: AtomicU32 = AtomicU32::new(0);
    static SDR1: AtomicU32 = AtomicU32::new(0);
    static SEGMENTS: [AtomicU32; 16] = [const { AtomicU32::new(0) }; 16];

    pub fn read_msr() -> u32 {
        MSR.load(Ordering::SeqCst)
    }

    pub fn write_msr(msr: u32) {
        MSR.store(msr, Ordering::SeqCst);
    }

    pub fn read_dar() -> u32 {
        DAR.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn write_dar(dar: u32) {
        DAR.store(dar, Ordering::SeqCst);
    }

    pub fn read_srin(ea: u32) -> u32 {
        SEGMENTS[(ea >> 28) as usize].load(Ordering::SeqCst)
    }

    pub fn write_srin(ea: u32, sr: u32) {
        SEGMENTS[(ea >> 28) as usize].store(sr, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn read_sdr1() -> u32 {
        SDR1.load(Ordering::SeqCst)
    }

    pub fn write_sdr1(sdr1: u32) {
        SDR1.store(sdr1, Ordering::SeqCst);
    }
}

pub use hw::*;

pub fn msr() -> Msr {
    Msr::from_bits_retain(read_msr())
}

pub fn set_msr(msr: Msr) {
    write_msr(msr.bits());
}

/// Serialises host tests that poke the modelled registers.
#[cfg(all(test, not(target_arch = "powerpc")))]
pub fn lock_for_test() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
