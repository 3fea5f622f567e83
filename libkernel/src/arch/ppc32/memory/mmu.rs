use super::pht_descriptors::{Sdr1, Vsid};
use crate::memory::address::VA;

/// MMU special registers used by the refill path.
pub trait MmuOps {
    /// Contents of DAR: the effective address of the last faulting load or
    /// store.
    fn fault_address(&self) -> VA;

    /// The VSID of the segment register selected by `va`'s top four bits.
    fn segment_vsid(&self, va: VA) -> Vsid;

    /// Points the MMU at a new hash table.
    fn set_pht_base(&self, sdr1: Sdr1);
}
