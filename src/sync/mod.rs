//! Kernel synchronization primitives
//!
//! Provides the per-process big lock and the handler-entry assertions
//! that enforce its discipline.

mod biglock;

pub use biglock::{verify_big_lock_acquired, verify_no_big_lock, BigLock, BigLockGuard, ThreadId};
