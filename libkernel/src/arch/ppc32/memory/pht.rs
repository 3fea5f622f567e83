use core::{ptr::NonNull, slice};

use log::{debug, info};
use static_assertions::assert_eq_size;

use super::{
    PHT_GROUPS, PHT_ORDER, PHT_SIZE, SLOTS_PER_GROUP,
    hash::HashAddress,
    mmu::MmuOps,
    pht_descriptors::{Api, PhtEntry, PhtSlot, Sdr1, Vsid},
};
use crate::{
    error::{KernelError, Result},
    memory::{
        address::{PA, VA},
        frame::{FrameAllocator, PhysTranslator},
    },
};

/// The eight slots a primary hash selects.
#[repr(C)]
pub struct PhtGroup {
    slots: [PhtSlot; SLOTS_PER_GROUP],
}

assert_eq_size!(PhtGroup, [u64; SLOTS_PER_GROUP]);

impl PhtGroup {
    pub fn slot(&self, idx: usize) -> &PhtSlot {
        &self.slots[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhtSlot> {
        self.slots.iter()
    }

    /// Index of the first slot with V clear that no writer has claimed.
    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|slot| {
            let entry = slot.load();
            !entry.is_valid() && !entry.is_busy()
        })
    }

    /// Index of the slot the MMU's primary search would stop at.
    pub fn find(&self, vsid: Vsid, api: Api) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.load().matches(vsid, api))
    }
}

/// The single, system-wide hashed page table.
///
/// Shared by every address space; slots are told apart by their VSID. The
/// table has no lock of its own: every slot access is atomic, and writers
/// serialise on the owning address space's page-table lock.
pub struct PageHashTable {
    groups: NonNull<PhtGroup>,
    base: PA,
}

// SAFETY: the table memory is never freed and all accesses to it go through
// atomics.
unsafe impl Send for PageHashTable {}
unsafe impl Sync for PageHashTable {}

impl PageHashTable {
    /// Allocates the table, zeroes it and points SDR1 at it.
    ///
    /// The block must come back aligned to its own size; SDR1 cannot
    /// describe anything else.
    pub fn init<T, A, M>(alloc: &mut A, mmu: &M) -> Result<Self>
    where
        T: PhysTranslator,
        A: FrameAllocator,
        M: MmuOps,
    {
        let base = alloc.alloc_frames(PHT_ORDER)?;

        if !base.is_aligned(PHT_SIZE) {
            return Err(KernelError::Misaligned {
                addr: base.value(),
                align: PHT_SIZE,
            });
        }

        let groups = NonNull::new(T::phys_to_virt(base).as_ptr_mut::<PhtGroup>())
            .ok_or(KernelError::NoMemory)?;

        let pht = Self { groups, base };
        pht.clear_all();

        let sdr1 = Sdr1::new(base, PHT_SIZE);
        mmu.set_pht_base(sdr1);

        info!(
            "PHT: {} KiB at {:?} ({} groups), SDR1 = {:?}",
            PHT_SIZE / 1024,
            base,
            PHT_GROUPS,
            sdr1
        );

        Ok(pht)
    }

    pub fn base(&self) -> PA {
        self.base
    }

    fn groups(&self) -> &[PhtGroup] {
        // SAFETY: `init` checked the block is PHT_SIZE bytes of memory owned
        // by the table for the rest of the kernel's life, and every bit
        // pattern is a valid PhtGroup.
        unsafe { slice::from_raw_parts(self.groups.as_ptr(), PHT_GROUPS) }
    }

    pub fn group(&self, idx: usize) -> &PhtGroup {
        &self.groups()[idx]
    }

    /// Zeroes every slot.
    pub fn clear_all(&self) {
        self.groups()
            .iter()
            .flat_map(PhtGroup::iter)
            .for_each(PhtSlot::clear);
    }

    /// Performs the MMU's primary-hash search for `va` in segment `vsid`.
    pub fn lookup(&self, vsid: Vsid, va: VA) -> Option<PhtEntry> {
        let hash = HashAddress::new(va, vsid);
        let group = self.group(hash.group());

        group
            .find(vsid, hash.api())
            .map(|idx| group.slot(idx).load())
    }

    /// Number of valid slots.
    pub fn occupancy(&self) -> usize {
        self.groups()
            .iter()
            .flat_map(PhtGroup::iter)
            .filter(|slot| slot.is_valid())
            .count()
    }

    /// Logs every valid slot.
    pub fn dump(&self) {
        debug!("PHT at {:?}, {} valid slots:", self.base, self.occupancy());

        for (gidx, group) in self.groups().iter().enumerate() {
            for (sidx, slot) in group.iter().enumerate() {
                let entry = slot.load();
                if entry.is_valid() {
                    debug!("  [{gidx:4}:{sidx}] {entry:?}");
                }
            }
        }
    }
}
