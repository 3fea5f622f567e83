use super::pht::PageHashTable;
use crate::{CpuOps, sync::IrqGuard};

/// Drops every translation in the table, for all address spaces.
///
/// Runs with local interrupts masked so a refill on this core cannot
/// interleave with the clear.
pub fn invalidate_all<C: CpuOps>(pht: &PageHashTable) {
    let _irq = IrqGuard::<C>::new();
    pht.clear_all();
}
