//! Process identity and sandbox syscalls
//!
//! Every handler follows the same gate, in order:
//! 1. assert the expected big-lock state
//! 2. check the required promise
//! 3. validate sizes, then copy inputs across the memory boundary
//! 4. validate the copied data
//! 5. perform a single mutation, or copy results out
//!
//! A failure at any step returns immediately; nothing before step 5
//! changes process state.

use alloc::vec::Vec;

use crate::cap::{PledgeMask, Promise};
use crate::proc::{ProcessName, ProcessState, MAX_COREDUMP_FIELD, MAX_PROCESS_NAME};
use crate::sync::{verify_big_lock_acquired, verify_no_big_lock, BigLockGuard};

use super::error::{SyscallError, SyscallResult};
use super::handler::{Args, SyscallContext};
use super::uaccess::{copy_bytes_from_user, copy_string_from_user, copy_to_user, UserPtr};

/// Maximum length of the promise list passed to `pledge`.
pub const MAX_PROMISES_LEN: usize = 1024;

fn enter_locked(ctx: &SyscallContext<'_>, state: &BigLockGuard<'_, ProcessState>) {
    verify_big_lock_acquired(ctx.process.big_lock(), ctx.tid);
    debug_assert!(state.guards(ctx.process.big_lock()));
}

/// getpid() -> pid
pub(super) fn sys_getpid(ctx: &SyscallContext<'_>, _args: &Args) -> SyscallResult {
    verify_no_big_lock(ctx.process.big_lock(), ctx.tid);
    ctx.process.pledge().require(Promise::Stdio)?;
    Ok(ctx.process.pid().as_u32() as usize)
}

/// getppid() -> ppid
pub(super) fn sys_getppid(ctx: &SyscallContext<'_>, _args: &Args) -> SyscallResult {
    verify_no_big_lock(ctx.process.big_lock(), ctx.tid);
    ctx.process.pledge().require(Promise::Stdio)?;
    Ok(ctx.process.ppid().as_u32() as usize)
}

/// get_process_name(buffer, buffer_size)
///
/// Writes the name and a terminating NUL into `buffer`.
pub(super) fn sys_get_process_name(
    ctx: &SyscallContext<'_>,
    state: &mut BigLockGuard<'_, ProcessState>,
    args: &Args,
) -> SyscallResult {
    enter_locked(ctx, state);
    ctx.process.pledge().require(Promise::Stdio)?;

    let buffer = UserPtr::new(args[0]);
    let buffer_size = args[1];
    let name = state.name().as_bytes();
    if name.len() + 1 > buffer_size {
        return Err(SyscallError::ResourceExceeded);
    }

    let mut out = Vec::with_capacity(name.len() + 1);
    out.extend_from_slice(name);
    out.push(0);
    copy_to_user(ctx.process.space(), buffer, &out)?;
    Ok(0)
}

/// set_process_name(name, name_length)
pub(super) fn sys_set_process_name(
    ctx: &SyscallContext<'_>,
    state: &mut BigLockGuard<'_, ProcessState>,
    args: &Args,
) -> SyscallResult {
    enter_locked(ctx, state);
    ctx.process.pledge().require(Promise::Proc)?;

    let user_name = UserPtr::new(args[0]);
    let user_name_length = args[1];
    if user_name_length > MAX_PROCESS_NAME {
        return Err(SyscallError::ResourceExceeded);
    }

    let bytes = copy_string_from_user(ctx.process.space(), user_name, user_name_length)?;
    let name = ProcessName::new(bytes)?;
    log::debug!(
        "proc: {} renamed {:?} -> {:?}",
        ctx.process.pid(),
        state.name(),
        name
    );
    state.set_name(name);
    Ok(0)
}

/// set_coredump_metadata(key, key_length, value, value_length)
///
/// Needs no promise beyond the baseline: it only annotates the caller.
pub(super) fn sys_set_coredump_metadata(
    ctx: &SyscallContext<'_>,
    state: &mut BigLockGuard<'_, ProcessState>,
    args: &Args,
) -> SyscallResult {
    enter_locked(ctx, state);

    let (key_ptr, key_len) = (UserPtr::new(args[0]), args[1]);
    let (value_ptr, value_len) = (UserPtr::new(args[2]), args[3]);
    if key_len == 0 {
        return Err(SyscallError::InvalidArgument);
    }
    if key_len > MAX_COREDUMP_FIELD || value_len > MAX_COREDUMP_FIELD {
        return Err(SyscallError::ResourceExceeded);
    }

    let key = copy_bytes_from_user(ctx.process.space(), key_ptr, key_len)?;
    let value = copy_bytes_from_user(ctx.process.space(), value_ptr, value_len)?;
    state.coredump_mut().set(key, value)?;
    Ok(0)
}

/// pledge(promises, promises_length)
///
/// A null `promises` pointer leaves the pledge unchanged.
pub(super) fn sys_pledge(
    ctx: &SyscallContext<'_>,
    state: &mut BigLockGuard<'_, ProcessState>,
    args: &Args,
) -> SyscallResult {
    enter_locked(ctx, state);

    let promises = UserPtr::new(args[0]);
    let promises_length = args[1];
    if promises.is_null() {
        return Ok(0);
    }
    if promises_length > MAX_PROMISES_LEN {
        return Err(SyscallError::ResourceExceeded);
    }

    let names = copy_string_from_user(ctx.process.space(), promises, promises_length)?;
    let requested = PledgeMask::parse(&names)?;
    let now = ctx.process.narrow_pledge(requested, state);
    log::info!("pledge: {} now holds {:?}", ctx.process.pid(), now);
    Ok(0)
}
