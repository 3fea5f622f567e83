#[cfg(feature = "arch-ppc32")]
pub mod ppc32;

#[cfg(feature = "arch-ppc32")]
pub use self::ppc32::Ppc32 as ArchImpl;
