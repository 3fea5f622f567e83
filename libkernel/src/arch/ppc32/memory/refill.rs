//! ISI/DSI handling: copying translations from the page table into the PHT.
//!
//! A storage exception on this MMU only means the hash table has no slot for
//! the access. The handler asks the address space's page table for the
//! mapping, escalates to the fault policy when there is none, and then
//! installs a primary-hash slot so the retried access hits.
//!
//! Locking: the ASID is snapshotted under the short metadata lock, and the
//! page-table lock is held from the first lookup to the slot write except
//! around the policy call, which may block.

use log::{debug, trace};

use super::{
    DEFAULT_PROTECTION, fatal,
    hash::HashAddress,
    mmu::MmuOps,
    pht::PageHashTable,
    pht_descriptors::PhtEntry,
    victim::{FixedVictim, VictimPolicy},
};
use crate::{
    CpuOps,
    arch::ppc32::exceptions::InterruptedState,
    memory::{
        address::VA,
        address_space::{AddressSpace, MappingInfo, PageTable},
        fault::{AccessKind, FaultContext, FaultPolicy, FaultResolution},
    },
    symtab::SymbolResolver,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefillOutcome {
    /// A slot now translates the faulting page.
    Installed {
        group: usize,
        slot: usize,
        /// Previous contents of the slot when the group was full.
        evicted: Option<PhtEntry>,
    },
    /// The fault belongs to a guarded user-copy routine; nothing was
    /// installed and the interrupted code sees the failure itself.
    Deferred,
    /// Another CPU took the chosen slot first, or the table was flushed
    /// mid-write. Nothing was installed; the retried access faults again.
    Contended { group: usize, slot: usize },
}

pub struct PhtRefill<'a, M, S: ?Sized, V = FixedVictim> {
    pht: &'a PageHashTable,
    mmu: &'a M,
    symtab: &'a S,
    victim: V,
}

impl<'a, M, S> PhtRefill<'a, M, S>
where
    M: MmuOps,
    S: SymbolResolver + ?Sized,
{
    pub fn new(pht: &'a PageHashTable, mmu: &'a M, symtab: &'a S) -> Self {
        Self {
            pht,
            mmu,
            symtab,
            victim: FixedVictim,
        }
    }
}

impl<'a, M, S, V> PhtRefill<'a, M, S, V>
where
    M: MmuOps,
    S: SymbolResolver + ?Sized,
    V: VictimPolicy,
{
    pub fn with_victim_policy<W: VictimPolicy>(self, victim: W) -> PhtRefill<'a, M, S, W> {
        PhtRefill {
            pht: self.pht,
            mmu: self.mmu,
            symtab: self.symtab,
            victim,
        }
    }

    /// ISI: the fetch address is the interrupted PC.
    pub fn instruction_storage<P, C, F>(
        &self,
        aspace: &AddressSpace<P, C>,
        policy: &F,
        state: &mut InterruptedState,
    ) -> RefillOutcome
    where
        P: PageTable,
        C: CpuOps,
        F: FaultPolicy<P, C, InterruptedState>,
    {
        let ctx = FaultContext {
            address: state.pc(),
            access: AccessKind::Instruction,
            state,
        };

        self.refill(aspace, policy, ctx)
    }

    /// DSI: the data address comes from DAR.
    pub fn data_storage<P, C, F>(
        &self,
        aspace: &AddressSpace<P, C>,
        policy: &F,
        state: &mut InterruptedState,
    ) -> RefillOutcome
    where
        P: PageTable,
        C: CpuOps,
        F: FaultPolicy<P, C, InterruptedState>,
    {
        let ctx = FaultContext {
            address: self.mmu.fault_address(),
            access: AccessKind::Data,
            state,
        };

        self.refill(aspace, policy, ctx)
    }

    pub fn refill<P, C, F>(
        &self,
        aspace: &AddressSpace<P, C>,
        policy: &F,
        mut ctx: FaultContext<'_, InterruptedState>,
    ) -> RefillOutcome
    where
        P: PageTable,
        C: CpuOps,
        F: FaultPolicy<P, C, InterruptedState>,
    {
        let address = ctx.address;
        let asid = aspace.asid();

        let mut table = aspace.lock_page_table();

        let mapping = match resident_mapping(&*table, address) {
            Some(mapping) => mapping,
            None => {
                drop(table);
                let resolution = policy.resolve(aspace, &mut ctx);
                table = aspace.lock_page_table();

                match resolution {
                    Ok(FaultResolution::Resolved) => match resident_mapping(&*table, address) {
                        Some(mapping) => mapping,
                        None => panic!(
                            "{address:#x}: fault policy resolved the fault but left no resident mapping"
                        ),
                    },
                    Ok(FaultResolution::Deferred) => {
                        debug!("{:?} fault at {address:?} deferred to its copy routine", ctx.access);
                        return RefillOutcome::Deferred;
                    }
                    Ok(FaultResolution::Denied) => {
                        drop(table);
                        fatal::report_and_halt(address, ctx.state.pc(), ctx.state.lr(), self.symtab);
                    }
                    Err(e) => panic!("{address:#x}: fault policy failed: {e}"),
                }
            }
        };

        table.mark_accessed(address);

        let hash = HashAddress::new(address, self.mmu.segment_vsid(address));
        let group = self.pht.group(hash.group());

        let slot = group
            .first_free()
            .unwrap_or_else(|| self.victim.choose_victim(group, &hash));
        let observed = group.slot(slot).load();
        let evicted = observed.is_valid().then_some(observed);

        // TODO: derive PP from the mapping once MappingInfo carries its
        // permissions; until then every page is read/write.
        let entry = PhtEntry::new_primary(hash.vsid(), hash.api(), mapping.frame, DEFAULT_PROTECTION);

        let published = group
            .slot(slot)
            .claim(observed)
            .is_some_and(|claim| claim.publish(entry));

        if !published {
            drop(table);
            debug!(
                "{address:?}: lost PHT group {} slot {slot} to another writer",
                hash.group()
            );
            return RefillOutcome::Contended {
                group: hash.group(),
                slot,
            };
        }

        drop(table);

        if let Some(old) = evicted {
            debug!(
                "PHT group {} full, evicted slot {slot} ({:?} api {:?})",
                hash.group(),
                old.vsid(),
                old.api()
            );
        }

        trace!(
            "{address:?} asid {} -> {:?}, {:?} group {} slot {slot}",
            asid.value(),
            mapping.frame,
            hash.vsid(),
            hash.group()
        );

        RefillOutcome::Installed {
            group: hash.group(),
            slot,
            evicted,
        }
    }
}

fn resident_mapping<P: PageTable>(table: &P, va: VA) -> Option<MappingInfo> {
    table.find_mapping(va).filter(MappingInfo::is_resident)
}
