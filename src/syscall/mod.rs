//! System Call Interface
//!
//! The gate every process-metadata syscall passes through.
//!
//! # Security Model
//! - Whitelist approach: only syscalls in `SYSCALL_TABLE` are allowed
//! - Each handler checks its pledge before doing any work
//! - User memory is only reached through `uaccess`
//! - Invalid inputs return errors, never panic
//!
//! # Current Syscalls
//! - 0x10: getpid()
//! - 0x11: getppid()
//! - 0x12: get_process_name(buffer, buffer_size)
//! - 0x13: set_process_name(name, name_length)
//! - 0x14: set_coredump_metadata(key, key_length, value, value_length)
//! - 0x15: pledge(promises, promises_length)

mod error;
mod handler;
mod process;
pub mod uaccess;

pub use error::{encode, SyscallError, SyscallResult};
pub use handler::{
    dispatch, lookup, numbers, Args, LockPolicy, SyscallContext, SyscallEntry, SyscallFrame,
    MAX_ARGS, SYSCALL_TABLE,
};
pub use process::MAX_PROMISES_LEN;
pub use uaccess::{
    copy_bytes_from_user, copy_from_user, copy_string_from_user, copy_to_user,
    validate_user_range, UserPtr, UserRange, MAX_USER_COPY,
};
