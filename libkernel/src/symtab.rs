use crate::memory::address::VA;

/// Maps code addresses back to symbol names for diagnostics.
pub trait SymbolResolver {
    /// Returns the name of the symbol closest to `addr`, if any is known.
    fn lookup_symbol(&self, addr: VA) -> Option<&str>;
}
