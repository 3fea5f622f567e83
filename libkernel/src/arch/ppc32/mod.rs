//! 32-bit PowerPC (OEA) support.

pub mod exceptions;
pub mod memory;
