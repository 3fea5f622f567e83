use core::fmt::Write;

use libkernel::{
    CpuOps,
    error::{KernelError, Result},
    sync::SpinLockIrq,
};
use log::{LevelFilter, Log, Metadata, Record};

use crate::arch::ArchImpl;

pub type Console = dyn Write + Send;

static CONSOLE: SpinLockIrq<Option<&'static mut Console>, ArchImpl> = SpinLockIrq::new(None);
static LOGGER: KernelLogger = KernelLogger;

struct KernelLogger;

/// Routes `log` records to `console`. Can only be done once.
pub fn init(console: &'static mut Console, level: LevelFilter) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|_| KernelError::InUse)?;

    *CONSOLE.lock_save_irq() = Some(console);
    log::set_max_level(level);

    Ok(())
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut console = CONSOLE.lock_save_irq();
        if let Some(out) = console.as_mut() {
            // There is nowhere to report a failing console.
            _ = writeln!(
                out,
                "[{:<5} {} cpu={}] {}",
                record.level(),
                record.target(),
                ArchImpl::id(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}
