use crate::memory::address::VA;

/// Register state saved by the exception prologue.
#[derive(Clone, Debug, Default)]
#[repr(C)]
pub struct InterruptedState {
    pub gprs: [u32; 32],
    pub cr: u32,
    pub lr: u32,
    pub ctr: u32,
    pub xer: u32,
    /// SRR0: address of the interrupted instruction.
    pub pc: u32,
    /// SRR1: MSR bits of the interrupted context.
    pub srr1: u32,
}

impl InterruptedState {
    pub fn pc(&self) -> VA {
        VA::from_value(self.pc as usize)
    }

    pub fn lr(&self) -> VA {
        VA::from_value(self.lr as usize)
    }

    pub fn sp(&self) -> VA {
        VA::from_value(self.gprs[1] as usize)
    }
}
