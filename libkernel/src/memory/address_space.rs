//! The slice of an address space the translation layer depends on.
//!
//! The page-table structure itself belongs to the generic memory manager; it
//! is reached through [`PageTable`]. What lives here are the two locks the
//! refill protocol is defined in terms of: the short metadata lock guarding
//! the address-space identifier and the page-table lock.

use super::address::{PageFrame, VA};
use crate::{
    CpuOps,
    sync::{SpinLockIrq, SpinLockIrqGuard},
};

/// Address-space identifier. Each live address space owns a distinct one,
/// from which its segment identifiers are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Asid(u32);

impl Asid {
    pub const KERNEL: Asid = Asid(0);

    pub const fn new(asid: u32) -> Self {
        Self(asid)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Result of a page-table query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingInfo {
    pub frame: PageFrame,
    /// Whether the frame is resident. A non-present entry still has to go
    /// through the fault policy.
    pub present: bool,
}

impl MappingInfo {
    pub fn is_resident(&self) -> bool {
        self.present
    }
}

/// The authoritative per-address-space page table.
pub trait PageTable {
    fn find_mapping(&self, va: VA) -> Option<MappingInfo>;

    /// Records that the mapping covering `va` has been referenced.
    fn mark_accessed(&mut self, va: VA);
}

pub type PageTableGuard<'a, P, C> = SpinLockIrqGuard<'a, P, C>;

struct AddressSpaceMeta {
    asid: Asid,
}

pub struct AddressSpace<P, C: CpuOps> {
    meta: SpinLockIrq<AddressSpaceMeta, C>,
    page_table: SpinLockIrq<P, C>,
}

impl<P: PageTable, C: CpuOps> AddressSpace<P, C> {
    pub fn new(asid: Asid, page_table: P) -> Self {
        Self {
            meta: SpinLockIrq::new(AddressSpaceMeta { asid }),
            page_table: SpinLockIrq::new(page_table),
        }
    }

    /// Snapshots the identifier. The metadata lock is held only for the read.
    pub fn asid(&self) -> Asid {
        self.meta.lock_save_irq().asid
    }

    pub fn set_asid(&self, asid: Asid) {
        self.meta.lock_save_irq().asid = asid;
    }

    pub fn lock_page_table(&self) -> PageTableGuard<'_, P, C> {
        self.page_table.lock_save_irq()
    }

    /// Takes the page-table lock unless the caller says it already holds it.
    ///
    /// Code reachable both directly and from inside a section that owns the
    /// lock passes what it knows; `None` means the caller's own guard stays
    /// the only one.
    pub fn lock_page_table_if_needed(&self, already_held: bool) -> Option<PageTableGuard<'_, P, C>> {
        if already_held {
            debug_assert!(self.page_table.is_locked());
            None
        } else {
            Some(self.lock_page_table())
        }
    }

    pub fn try_lock_page_table(&self) -> Option<PageTableGuard<'_, P, C>> {
        self.page_table.try_lock_save_irq()
    }
}
