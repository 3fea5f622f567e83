use libkernel::{
    arch::ppc32::memory::{
        mmu::MmuOps,
        pht_descriptors::{SegmentRegister, Sdr1, Vsid},
    },
    memory::address::VA,
};

mod cpu_ops;
pub mod exceptions;
pub mod memory;
pub(crate) mod registers;

/// 32-bit PowerPC with the OEA hashed MMU.
pub struct Ppc32;

impl MmuOps for Ppc32 {
    fn fault_address(&self) -> VA {
        VA::from_value(registers::read_dar() as usize)
    }

    fn segment_vsid(&self, va: VA) -> Vsid {
        SegmentRegister::from_raw(registers::read_srin(va.value() as u32)).vsid()
    }

    fn set_pht_base(&self, sdr1: Sdr1) {
        registers::write_sdr1(sdr1.as_raw());
    }
}
