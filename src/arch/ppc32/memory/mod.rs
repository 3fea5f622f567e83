use libkernel::{
    arch::ppc32::memory::{
        pht::PageHashTable,
        pht_descriptors::{SegmentRegister, Vsid},
        tlb,
    },
    error::{KernelError, Result},
    memory::{
        address::{PA, VA},
        address_space::Asid,
        frame::{FrameAllocator, PhysTranslator},
    },
};
use log::warn;
use spin::Once;

use super::{Ppc32, registers};

/// Base of the kernel's linear map of physical memory.
#[cfg(target_arch = "powerpc")]
pub const PAGE_OFFSET: usize = 0x8000_0000;

#[cfg(not(target_arch = "powerpc"))]
pub const PAGE_OFFSET: usize = 0;

/// First segment of the kernel half of the address space.
pub const KERNEL_SEGMENT: usize = 8;

pub struct KernelTranslator;

impl PhysTranslator for KernelTranslator {
    fn phys_to_virt(pa: PA) -> VA {
        VA::from_value(pa.value() + PAGE_OFFSET)
    }
}

static PHT: Once<PageHashTable> = Once::new();

/// Allocates the page hash table and registers it with the MMU.
///
/// Boot cannot continue without the table, so an allocator that fails to
/// provide it panics. A second call returns `InUse`.
pub fn tlb_arch_init<A: FrameAllocator>(alloc: &mut A) -> Result<&'static PageHashTable> {
    let mut fresh = false;

    let pht = PHT.call_once(|| {
        fresh = true;
        PageHashTable::init::<KernelTranslator, _, _>(alloc, &Ppc32)
            .unwrap_or_else(|e| panic!("Cannot set up the page hash table: {e}"))
    });

    if fresh { Ok(pht) } else { Err(KernelError::InUse) }
}

pub fn pht() -> Option<&'static PageHashTable> {
    PHT.get()
}

pub fn tlb_invalidate_all() {
    if let Some(pht) = PHT.get() {
        tlb::invalidate_all::<Ppc32>(pht);
    }
}

pub fn pht_print() {
    match PHT.get() {
        Some(pht) => pht.dump(),
        None => warn!("pht_print: page hash table not set up"),
    }
}

/// Loads the segment registers for `asid`.
///
/// The user half gets the address space's own VSIDs; the kernel half always
/// carries the kernel's, so kernel translations are shared by every space.
pub fn as_install(asid: Asid) {
    for segment in 0..16 {
        let (owner, user_key) = if segment < KERNEL_SEGMENT {
            (asid, true)
        } else {
            (Asid::KERNEL, false)
        };

        let sr = SegmentRegister::new(Vsid::for_segment(owner, segment), user_key);
        registers::write_srin((segment << 28) as u32, sr.as_raw());
    }
}

/// Brings up the global table on the host, once per test binary.
#[cfg(test)]
pub(crate) fn boot_for_test() -> &'static PageHashTable {
    use std::alloc::{Layout, alloc};

    use libkernel::{arch::ppc32::memory::PHT_SIZE, memory::PAGE_SIZE};

    struct LeakingAllocator;

    impl FrameAllocator for LeakingAllocator {
        fn alloc_frames(&mut self, order: usize) -> Result<PA> {
            let size = PAGE_SIZE << order;
            let ptr = unsafe { alloc(Layout::from_size_align(size, size).unwrap()) };
            assert!(!ptr.is_null());
            unsafe { ptr.write_bytes(0xff, size) };
            Ok(PA::from_value(ptr as usize))
        }
    }

    assert_eq!(PAGE_SIZE << libkernel::arch::ppc32::memory::PHT_ORDER, PHT_SIZE);

    match tlb_arch_init(&mut LeakingAllocator) {
        Ok(pht) => pht,
        Err(_) => PHT.get().unwrap(),
    }
}
