use log::error;

use crate::{memory::address::VA, symtab::SymbolResolver};

/// Reports a storage fault nobody can satisfy and stops.
///
/// Names `pc` and `lr` after their nearest symbols (empty when unknown) and
/// panics; the panic handler takes the CPU down.
pub fn report_and_halt<S>(fault_address: VA, pc: VA, lr: VA, symtab: &S) -> !
where
    S: SymbolResolver + ?Sized,
{
    let pc_symbol = symtab.lookup_symbol(pc).unwrap_or("");
    let lr_symbol = symtab.lookup_symbol(lr).unwrap_or("");

    error!("Unrecoverable storage fault at {fault_address:?} (pc {pc:?}, lr {lr:?})");

    panic!(
        "{:#x}: PHT Refill Exception at {:#x} ({}<-{})",
        fault_address, pc, pc_symbol, lr_symbol
    );
}
