//! Typed physical and virtual addresses.

use core::fmt;

use super::{PAGE_SHIFT, PAGE_SIZE};

macro_rules! define_address {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(usize);

        impl $name {
            pub const fn from_value(value: usize) -> Self {
                Self(value)
            }

            pub const fn value(self) -> usize {
                self.0
            }

            pub const fn is_aligned(self, align: usize) -> bool {
                self.0 & (align - 1) == 0
            }

            pub const fn page_aligned(self) -> Self {
                Self(self.0 & !(PAGE_SIZE - 1))
            }

            pub const fn page_offset(self) -> usize {
                self.0 & (PAGE_SIZE - 1)
            }

            pub const fn add_bytes(self, bytes: usize) -> Self {
                Self(self.0 + bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:#x})"), self.0)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

define_address!(
    /// A virtual address.
    VA
);

define_address!(
    /// A physical address.
    PA
);

impl VA {
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn as_ptr_mut<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

impl PA {
    pub const fn to_pfn(self) -> PageFrame {
        PageFrame::from_pfn(self.0 >> PAGE_SHIFT)
    }
}

/// A physical page frame, identified by its frame number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageFrame {
    n: usize,
}

impl PageFrame {
    pub const fn from_pfn(n: usize) -> Self {
        Self { n }
    }

    pub const fn value(self) -> usize {
        self.n
    }

    pub const fn pa(self) -> PA {
        PA::from_value(self.n << PAGE_SHIFT)
    }
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageFrame({:#x})", self.n)
    }
}
