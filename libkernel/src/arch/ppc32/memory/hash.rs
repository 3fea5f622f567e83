use core::mem::size_of;

use super::{
    PHT_GROUPS, SLOTS_PER_GROUP,
    pht_descriptors::{Api, PhtSlot, Vsid},
};
use crate::memory::{PAGE_SHIFT, address::VA};

/// Where the MMU's primary search for a (VSID, address) pair lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashAddress {
    vsid: Vsid,
    page_index: u32,
    api: Api,
    group: usize,
}

impl HashAddress {
    pub fn new(va: VA, vsid: Vsid) -> Self {
        // The segment number (top four bits) is not part of the page index;
        // it reaches the hash through the VSID.
        let page_index = ((va.value() >> PAGE_SHIFT) & 0xffff) as u32;
        let group = (vsid.value() ^ page_index) as usize & (PHT_GROUPS - 1);

        Self {
            vsid,
            page_index,
            api: Api::from_va(va),
            group,
        }
    }

    pub fn vsid(&self) -> Vsid {
        self.vsid
    }

    /// The 16-bit page index within the segment.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn api(&self) -> Api {
        self.api
    }

    /// Index of the primary group.
    pub fn group(&self) -> usize {
        self.group
    }

    /// Index of the group's first slot within the table.
    pub fn slot_offset(&self) -> usize {
        self.group * SLOTS_PER_GROUP
    }

    pub fn byte_offset(&self) -> usize {
        self.slot_offset() * size_of::<PhtSlot>()
    }
}
