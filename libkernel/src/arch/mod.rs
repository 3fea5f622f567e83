#[cfg(feature = "arch-ppc32")]
pub mod ppc32;
