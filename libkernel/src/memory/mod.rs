pub mod address;
pub mod address_space;
pub mod fault;
pub mod frame;

pub const PAGE_SHIFT: usize = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
