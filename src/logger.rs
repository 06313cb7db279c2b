//! Kernel Logger
//!
//! Backs the `log` facade. Records are formatted as
//! `[LEVEL] target: message` and written to whatever console the
//! platform registered with `set_console`; until then they are dropped.
//!
//! # Security Considerations
//! - Uses a spinlock so records from concurrent handlers don't interleave
//! - User-supplied bytes are only ever logged through `Debug`, which
//!   escapes control characters

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Console sink, usually the serial port.
static CONSOLE: Mutex<Option<&'static mut (dyn Write + Send)>> = Mutex::new(None);

static LOGGER: KernelLogger = KernelLogger;
static INSTALLED: AtomicBool = AtomicBool::new(false);

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = CONSOLE.lock().as_mut() {
            // Nothing useful to do if the console itself fails.
            let _ = write_record(&mut **console, record);
        }
    }

    fn flush(&self) {}
}

/// Format one record the way the kernel console shows it.
pub fn write_record(out: &mut dyn Write, record: &Record<'_>) -> fmt::Result {
    writeln!(out, "[{}] {}: {}", record.level(), record.target(), record.args())
}

/// Register the console sink, replacing any previous one.
pub fn set_console(console: &'static mut (dyn Write + Send)) {
    *CONSOLE.lock() = Some(console);
}

/// Install the kernel logger and set the maximum level.
///
/// Calling this again only updates the level.
/// Fails if some other logger was installed first.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    if !INSTALLED.swap(true, Ordering::AcqRel) {
        if let Err(e) = log::set_logger(&LOGGER) {
            INSTALLED.store(false, Ordering::Release);
            return Err(e);
        }
    }
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use log::Level;

    #[test]
    fn test_record_format() {
        let mut out = String::new();
        write_record(
            &mut out,
            &Record::builder()
                .level(Level::Warn)
                .target("veilkernel::syscall")
                .args(format_args!("unknown syscall {:#x}", 0x99))
                .build(),
        )
        .unwrap();
        assert_eq!(out, "[WARN] veilkernel::syscall: unknown syscall 0x99\n");
    }

    #[test]
    fn test_enabled_follows_max_level() {
        init(LevelFilter::Info).unwrap();
        init(LevelFilter::Info).unwrap();
        let info = Metadata::builder().level(Level::Info).build();
        let trace = Metadata::builder().level(Level::Trace).build();
        assert!(LOGGER.enabled(&info));
        assert!(!LOGGER.enabled(&trace));
    }
}
