use super::{address::VA, address_space::AddressSpace};
use crate::{CpuOps, error::Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Instruction fetch; the faulting address is the interrupted PC.
    Instruction,
    /// Load or store; the faulting address comes from the fault-address
    /// register.
    Data,
}

/// Everything the fault policy learns about a miss. Lives on the refill
/// handler's stack for the duration of one invocation.
pub struct FaultContext<'a, S> {
    pub address: VA,
    pub access: AccessKind,
    pub state: &'a mut S,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultResolution {
    /// A resident mapping now exists for the faulting address.
    Resolved,
    /// The fault hit a guarded user-copy routine, which will observe and
    /// report the failure itself.
    Deferred,
    /// The access is invalid and cannot be satisfied.
    Denied,
}

/// Higher-level page-fault handling: demand paging, copy-on-write, swap-in.
///
/// Called with the page-table lock released and allowed to block. An `Err`
/// return is treated as a broken policy, not as a fault outcome.
pub trait FaultPolicy<P, C: CpuOps, S> {
    fn resolve(
        &self,
        aspace: &AddressSpace<P, C>,
        ctx: &mut FaultContext<'_, S>,
    ) -> Result<FaultResolution>;
}
