//! Page Hash Table management.
//!
//! The OEA MMU does not walk page tables. On a TLB miss it searches a
//! hashed, 8-way associative table of translations whose location is held in
//! SDR1, and raises an ISI/DSI when it finds nothing. Software keeps that
//! table in sync with the real page tables lazily, from the storage
//! exception handlers.

use static_assertions::const_assert;

use crate::memory::PAGE_SHIFT;

pub mod fatal;
pub mod hash;
pub mod mmu;
pub mod pht;
pub mod pht_descriptors;
pub mod refill;
pub mod tlb;
pub mod victim;

use pht_descriptors::{PageProtection, PhtSlot};

/// log2 of the table size in bytes. 64 KiB is the architectural minimum.
pub const PHT_BITS: usize = 16;
pub const PHT_SIZE: usize = 1 << PHT_BITS;
/// Allocation order of the table, in frames.
pub const PHT_ORDER: usize = PHT_BITS - PAGE_SHIFT;

pub const SLOTS_PER_GROUP: usize = 8;
pub const PHT_SLOTS: usize = PHT_SIZE / core::mem::size_of::<PhtSlot>();
pub const PHT_GROUPS: usize = PHT_SLOTS / SLOTS_PER_GROUP;

/// Protection class written into every refilled slot.
pub const DEFAULT_PROTECTION: PageProtection = PageProtection::ReadWrite;

const_assert!(PHT_BITS >= 16 && PHT_BITS <= 25);
const_assert!(PHT_GROUPS.is_power_of_two());
