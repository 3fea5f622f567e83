use super::address::{PA, VA};
use crate::error::Result;

/// Source of physically contiguous memory.
pub trait FrameAllocator {
    /// Allocates `2^order` contiguous frames. The returned block is expected
    /// to be naturally aligned to its own size.
    fn alloc_frames(&mut self, order: usize) -> Result<PA>;
}

/// Converts physical addresses into addresses the kernel can dereference.
pub trait PhysTranslator {
    fn phys_to_virt(pa: PA) -> VA;
}
