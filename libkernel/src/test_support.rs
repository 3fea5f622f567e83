//! Host-side stand-ins for the collaborators the refill path is written
//! against.

use std::{
    alloc::{Layout, alloc},
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crate::{
    CpuOps,
    arch::ppc32::memory::{
        mmu::MmuOps,
        pht::PageHashTable,
        pht_descriptors::{Sdr1, Vsid},
    },
    error::{KernelError, Result},
    memory::{
        PAGE_SIZE,
        address::{PA, PageFrame, VA},
        address_space::{AddressSpace, Asid, MappingInfo, PageTable},
        fault::{AccessKind, FaultContext, FaultPolicy, FaultResolution},
        frame::{FrameAllocator, PhysTranslator},
    },
    symtab::SymbolResolver,
};

thread_local! {
    static IRQS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// A CPU whose interrupt mask is a per-thread flag.
pub struct TestCpu;

impl TestCpu {
    pub fn interrupts_enabled() -> bool {
        IRQS_ENABLED.with(Cell::get)
    }
}

impl CpuOps for TestCpu {
    fn id() -> usize {
        0
    }

    fn halt() -> ! {
        panic!("TestCpu halted");
    }

    fn disable_interrupts() -> usize {
        IRQS_ENABLED.with(|e| e.replace(false)) as usize
    }

    fn restore_interrupt_state(flags: usize) {
        IRQS_ENABLED.with(|e| e.set(flags != 0));
    }

    fn enable_interrupts() {
        IRQS_ENABLED.with(|e| e.set(true));
    }
}

enum SegmentMap {
    Fixed(Vsid),
    PerAsid(Asid),
}

pub struct MockMmu {
    segments: SegmentMap,
    dar: AtomicUsize,
    sdr1: Mutex<Option<Sdr1>>,
}

impl MockMmu {
    /// Every segment resolves to `vsid`.
    pub fn with_vsid(vsid: Vsid) -> Self {
        Self::new(SegmentMap::Fixed(vsid))
    }

    /// Segment registers loaded for `asid`.
    pub fn for_asid(asid: Asid) -> Self {
        Self::new(SegmentMap::PerAsid(asid))
    }

    fn new(segments: SegmentMap) -> Self {
        Self {
            segments,
            dar: AtomicUsize::new(0),
            sdr1: Mutex::new(None),
        }
    }

    pub fn set_dar(&self, va: VA) {
        self.dar.store(va.value(), Ordering::Relaxed);
    }

    pub fn sdr1(&self) -> Option<Sdr1> {
        *self.sdr1.lock().unwrap()
    }
}

impl MmuOps for MockMmu {
    fn fault_address(&self) -> VA {
        VA::from_value(self.dar.load(Ordering::Relaxed))
    }

    fn segment_vsid(&self, va: VA) -> Vsid {
        match self.segments {
            SegmentMap::Fixed(vsid) => vsid,
            SegmentMap::PerAsid(asid) => Vsid::for_segment(asid, va.value() >> 28),
        }
    }

    fn set_pht_base(&self, sdr1: Sdr1) {
        *self.sdr1.lock().unwrap() = Some(sdr1);
    }
}

#[derive(Default)]
enum AllocMode {
    #[default]
    Aligned,
    Misaligned,
    Exhausted,
}

/// Hands out leaked heap blocks, pre-filled with garbage. Physical and
/// virtual addresses are the same.
#[derive(Default)]
pub struct HeapFrameAllocator {
    mode: AllocMode,
}

impl HeapFrameAllocator {
    /// Returns blocks offset by one page from their natural alignment.
    pub fn misaligned() -> Self {
        Self {
            mode: AllocMode::Misaligned,
        }
    }

    pub fn exhausted() -> Self {
        Self {
            mode: AllocMode::Exhausted,
        }
    }
}

fn leak_block(size: usize, align: usize) -> usize {
    let layout = Layout::from_size_align(size, align).unwrap();
    let ptr = unsafe { alloc(layout) };
    assert!(!ptr.is_null());
    unsafe { ptr.write_bytes(0xa5, size) };
    ptr as usize
}

impl FrameAllocator for HeapFrameAllocator {
    fn alloc_frames(&mut self, order: usize) -> Result<PA> {
        let size = PAGE_SIZE << order;

        match self.mode {
            AllocMode::Aligned => Ok(PA::from_value(leak_block(size, size))),
            AllocMode::Misaligned => Ok(PA::from_value(leak_block(size * 2, size) + PAGE_SIZE)),
            AllocMode::Exhausted => Err(KernelError::NoMemory),
        }
    }
}

pub struct IdentityTranslator;

impl PhysTranslator for IdentityTranslator {
    fn phys_to_virt(pa: PA) -> VA {
        VA::from_value(pa.value())
    }
}

/// A freshly initialised table and the MMU it was registered with.
pub fn test_pht() -> (PageHashTable, MockMmu) {
    let mmu = MockMmu::with_vsid(Vsid::new(0));
    let pht = PageHashTable::init::<IdentityTranslator, _, _>(&mut HeapFrameAllocator::default(), &mmu)
        .ok()
        .unwrap();
    (pht, mmu)
}

/// A page table keyed by virtual page number.
#[derive(Default)]
pub struct FlatPageTable {
    pages: BTreeMap<usize, MappingInfo>,
    accessed: BTreeSet<usize>,
}

impl FlatPageTable {
    pub fn map(&mut self, va: VA, pfn: usize) {
        self.insert(va, pfn, true);
    }

    /// Records a mapping whose frame is not resident.
    pub fn map_swapped(&mut self, va: VA, pfn: usize) {
        self.insert(va, pfn, false);
    }

    fn insert(&mut self, va: VA, pfn: usize, present: bool) {
        self.pages.insert(
            va.page_number(),
            MappingInfo {
                frame: PageFrame::from_pfn(pfn),
                present,
            },
        );
    }

    pub fn is_accessed(&self, va: VA) -> bool {
        self.accessed.contains(&va.page_number())
    }
}

impl PageTable for FlatPageTable {
    fn find_mapping(&self, va: VA) -> Option<MappingInfo> {
        self.pages.get(&va.page_number()).copied()
    }

    fn mark_accessed(&mut self, va: VA) {
        self.accessed.insert(va.page_number());
    }
}

/// A fault policy that returns a canned answer and records how it was
/// called.
pub struct ScriptedPolicy {
    outcome: Result<FaultResolution>,
    install: Option<usize>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(VA, AccessKind)>>,
    lock_was_free: AtomicBool,
}

impl ScriptedPolicy {
    pub fn new(outcome: Result<FaultResolution>) -> Self {
        Self {
            outcome,
            install: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            lock_was_free: AtomicBool::new(false),
        }
    }

    /// Maps the faulting page to `pfn` and reports the fault resolved.
    pub fn installing(pfn: usize) -> Self {
        Self {
            install: Some(pfn),
            ..Self::new(Ok(FaultResolution::Resolved))
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn seen(&self) -> Vec<(VA, AccessKind)> {
        self.seen.lock().unwrap().clone()
    }

    /// Whether the page-table lock was free during the last call.
    pub fn lock_was_free(&self) -> bool {
        self.lock_was_free.load(Ordering::Relaxed)
    }
}

impl<C: CpuOps, S> FaultPolicy<FlatPageTable, C, S> for ScriptedPolicy {
    fn resolve(
        &self,
        aspace: &AddressSpace<FlatPageTable, C>,
        ctx: &mut FaultContext<'_, S>,
    ) -> Result<FaultResolution> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().unwrap().push((ctx.address, ctx.access));

        match aspace.try_lock_page_table() {
            Some(mut table) => {
                self.lock_was_free.store(true, Ordering::Relaxed);
                if let Some(pfn) = self.install {
                    table.map(ctx.address.page_aligned(), pfn);
                }
            }
            None => self.lock_was_free.store(false, Ordering::Relaxed),
        }

        self.outcome
    }
}

/// A symbol table that counts how often it is consulted.
#[derive(Default)]
pub struct CountingSymtab {
    symbols: Vec<(usize, &'static str)>,
    lookups: AtomicUsize,
}

impl CountingSymtab {
    pub fn with_symbols(symbols: &[(usize, &'static str)]) -> Self {
        Self {
            symbols: symbols.to_vec(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl SymbolResolver for CountingSymtab {
    fn lookup_symbol(&self, addr: VA) -> Option<&str> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        self.symbols
            .iter()
            .filter(|(start, _)| *start <= addr.value())
            .max_by_key(|(start, _)| *start)
            .map(|(_, name)| *name)
    }
}
