//! ppc32 glue for the hashed-MMU translation layer: register access, the
//! boot-time page hash table and the storage exception entry points.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "powerpc", feature(asm_experimental_arch))]

pub mod arch;
pub mod logger;
pub mod panic;
pub mod symtab;
