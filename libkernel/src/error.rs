use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    #[error("out of memory")]
    NoMemory,

    #[error("address {addr:#x} is not aligned to {align:#x}")]
    Misaligned { addr: usize, align: usize },

    #[error("resource is already in use")]
    InUse,

    #[error("fault policy produced an unexpected result")]
    InvalidPolicyResult,
}

pub type Result<T> = core::result::Result<T, KernelError>;
