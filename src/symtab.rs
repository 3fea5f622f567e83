//! Kernel symbol table, used to name code addresses in fatal reports.

use libkernel::{
    error::{KernelError, Result},
    memory::address::VA,
    symtab::SymbolResolver,
};
use spin::Once;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    pub addr: usize,
    pub name: &'static str,
}

/// Symbols sorted by start address. An address resolves to the closest
/// symbol at or below it.
#[derive(Debug)]
pub struct KernelSymtab {
    entries: &'static [SymbolEntry],
}

impl KernelSymtab {
    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    pub fn new(entries: &'static [SymbolEntry]) -> Self {
        debug_assert!(
            entries.is_sorted_by_key(|e| e.addr),
            "symbol table is not sorted"
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolResolver for KernelSymtab {
    fn lookup_symbol(&self, addr: VA) -> Option<&str> {
        let idx = self.entries.partition_point(|e| e.addr <= addr.value());
        idx.checked_sub(1).map(|i| self.entries[i].name)
    }
}

static SYMTAB: Once<KernelSymtab> = Once::new();
static NO_SYMBOLS: KernelSymtab = KernelSymtab::empty();

/// Installs the kernel's symbol table. Only the first call takes effect.
pub fn register(entries: &'static [SymbolEntry]) -> Result<()> {
    let mut fresh = false;

    SYMTAB.call_once(|| {
        fresh = true;
        KernelSymtab::new(entries)
    });

    if fresh { Ok(()) } else { Err(KernelError::InUse) }
}

pub fn kernel_symtab() -> &'static KernelSymtab {
    SYMTAB.get().unwrap_or(&NO_SYMBOLS)
}
