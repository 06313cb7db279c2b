//! Veil - Pledge-Sandboxed Process Syscall Gate
//!
//! The kernel side of the process-metadata syscalls of a security-focused
//! kernel: identity, naming, coredump annotations and the pledge sandbox.
//!
//! # Gate Order
//! Every handler runs the same sequence:
//! 1. Big-lock state is asserted (held for mutators, absent for readers)
//! 2. The required promise is checked against the caller's pledge
//! 3. Sizes are validated and user memory is copied in
//! 4. Copied data is validated
//! 5. A single state mutation happens, or results are copied out
//!
//! # Security Features
//! - Memory safety via Rust's ownership model
//! - Promises can only be dropped, never regained
//! - User pointers are never dereferenced, only copied through `uaccess`
//! - Per-process big lock with debug-checked discipline
//!
//! # Targets
//! Builds as a `no_std` library for bare-metal AArch64 (`target_os =
//! "none"`, where it also provides the global heap) and for the host,
//! where the unit tests run.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod cap;
pub mod config;
pub mod logger;
pub mod mm;
pub mod proc;
pub mod sync;
pub mod syscall;

pub use config::KernelConfig;

use spin::Once;

/// Kernel version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static INIT: Once<()> = Once::new();

/// Bring up the kernel services this crate owns.
///
/// Sets up the heap (bare metal only) and the logger. Later calls are
/// ignored.
pub fn init(config: &KernelConfig) {
    INIT.call_once(|| {
        #[cfg(target_os = "none")]
        mm::init_heap();

        if logger::init(config.log_level).is_err() {
            // Someone else owns the `log` facade; their logger gets our records.
            log::set_max_level(config.log_level);
        }

        log::info!("[BOOT] veilkernel v{}", VERSION);
        #[cfg(target_os = "none")]
        log::info!("[BOOT] Heap initialized ({} KiB)", mm::heap_size() / mm::KIB);
        log::info!("[BOOT] Root promises: {:?}", config.initial_promises);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = KernelConfig::from_cmdline(b"loglevel=info").unwrap();
        init(&config);
        init(&config);
        assert_eq!(log::max_level(), log::LevelFilter::Info);
    }
}
