//! ISI and DSI entry points, called by the vector stubs once the interrupted
//! state has been saved. External interrupts are still masked.

use libkernel::{
    arch::ppc32::{
        exceptions::InterruptedState,
        memory::refill::{PhtRefill, RefillOutcome},
    },
    memory::{
        address_space::{AddressSpace, PageTable},
        fault::FaultPolicy,
    },
};

use super::{Ppc32, memory};
use crate::symtab::{KernelSymtab, kernel_symtab};

fn refill_handler() -> PhtRefill<'static, Ppc32, KernelSymtab> {
    let Some(pht) = memory::pht() else {
        panic!("Storage exception before the page hash table was set up");
    };

    PhtRefill::new(pht, &Ppc32, kernel_symtab())
}

pub fn instruction_storage_exception<P, F>(
    aspace: &AddressSpace<P, Ppc32>,
    policy: &F,
    state: &mut InterruptedState,
) -> RefillOutcome
where
    P: PageTable,
    F: FaultPolicy<P, Ppc32, InterruptedState>,
{
    refill_handler().instruction_storage(aspace, policy, state)
}

pub fn data_storage_exception<P, F>(
    aspace: &AddressSpace<P, Ppc32>,
    policy: &F,
    state: &mut InterruptedState,
) -> RefillOutcome
where
    P: PageTable,
    F: FaultPolicy<P, Ppc32, InterruptedState>,
{
    refill_handler().data_storage(aspace, policy, state)
}
