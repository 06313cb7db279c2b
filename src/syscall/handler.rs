//! System Call Dispatcher
//!
//! Maps syscall numbers to handlers and applies the big-lock policy
//! around them.
//!
//! # Security Considerations
//! - All syscall numbers are validated against the table
//! - Unknown syscalls return ENOSYS
//! - Lock-required handlers always run with the caller's big lock held,
//!   lock-free handlers never do

use crate::proc::{Process, ProcessState};
use crate::sync::{BigLockGuard, ThreadId};

use super::error::{encode, SyscallError, SyscallResult};
use super::process;

/// System call numbers
pub mod numbers {
    pub const SYS_GETPID: usize = 0x10;
    pub const SYS_GETPPID: usize = 0x11;
    pub const SYS_GET_PROCESS_NAME: usize = 0x12;
    pub const SYS_SET_PROCESS_NAME: usize = 0x13;
    pub const SYS_SET_COREDUMP_METADATA: usize = 0x14;
    pub const SYS_PLEDGE: usize = 0x15;
}

/// Register where the syscall number is passed (x8).
const NUMBER_REG: usize = 8;

/// Number of argument registers (x0-x5).
pub const MAX_ARGS: usize = 6;

/// Syscall arguments as raw register values.
pub type Args = [usize; MAX_ARGS];

/// User register state saved at syscall entry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallFrame {
    /// General purpose registers x0-x30
    pub gpr: [u64; 31],
    /// Exception Link Register (return address)
    pub elr: u64,
    /// Saved Program Status Register
    pub spsr: u64,
}

impl SyscallFrame {
    /// Build a frame for syscall `number` with the given arguments.
    pub fn new(number: usize, args: &[usize]) -> Self {
        let mut frame = Self::default();
        frame.gpr[NUMBER_REG] = number as u64;
        for (reg, &arg) in frame.gpr.iter_mut().zip(args.iter().take(MAX_ARGS)) {
            *reg = arg as u64;
        }
        frame
    }

    /// Syscall number (x8).
    #[inline]
    pub fn number(&self) -> usize {
        self.gpr[NUMBER_REG] as usize
    }

    /// Arguments (x0-x5).
    pub fn args(&self) -> Args {
        let mut args = [0; MAX_ARGS];
        for (arg, &reg) in args.iter_mut().zip(self.gpr.iter()) {
            *arg = reg as usize;
        }
        args
    }

    /// Return value (x0).
    #[inline]
    pub fn return_value(&self) -> i64 {
        self.gpr[0] as i64
    }

    /// Place the return value in x0.
    #[inline]
    pub fn set_return(&mut self, value: i64) {
        self.gpr[0] = value as u64;
    }
}

/// Who is making the call.
#[derive(Clone, Copy)]
pub struct SyscallContext<'a> {
    /// Calling process.
    pub process: &'a Process,
    /// Calling kernel thread.
    pub tid: ThreadId,
}

impl<'a> SyscallContext<'a> {
    pub fn new(process: &'a Process, tid: ThreadId) -> Self {
        Self { process, tid }
    }
}

/// Handler for calls that only read immutable process fields.
pub type FreeHandler = fn(&SyscallContext<'_>, &Args) -> SyscallResult;

/// Handler for calls that read or mutate locked process state.
pub type LockedHandler =
    fn(&SyscallContext<'_>, &mut BigLockGuard<'_, ProcessState>, &Args) -> SyscallResult;

/// A handler together with its lock classification.
#[derive(Clone, Copy)]
pub enum Handler {
    Free(FreeHandler),
    Locked(LockedHandler),
}

/// Big-lock classification of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Dispatcher holds the process big lock around the handler.
    Required,
    /// Handler runs without the big lock.
    Free,
}

/// One row of the syscall table.
pub struct SyscallEntry {
    pub number: usize,
    pub name: &'static str,
    pub handler: Handler,
}

impl SyscallEntry {
    /// Lock classification of this entry.
    pub const fn lock_policy(&self) -> LockPolicy {
        match self.handler {
            Handler::Free(_) => LockPolicy::Free,
            Handler::Locked(_) => LockPolicy::Required,
        }
    }
}

/// The syscall table.
pub static SYSCALL_TABLE: [SyscallEntry; 6] = [
    SyscallEntry {
        number: numbers::SYS_GETPID,
        name: "getpid",
        handler: Handler::Free(process::sys_getpid),
    },
    SyscallEntry {
        number: numbers::SYS_GETPPID,
        name: "getppid",
        handler: Handler::Free(process::sys_getppid),
    },
    SyscallEntry {
        number: numbers::SYS_GET_PROCESS_NAME,
        name: "get_process_name",
        handler: Handler::Locked(process::sys_get_process_name),
    },
    SyscallEntry {
        number: numbers::SYS_SET_PROCESS_NAME,
        name: "set_process_name",
        handler: Handler::Locked(process::sys_set_process_name),
    },
    SyscallEntry {
        number: numbers::SYS_SET_COREDUMP_METADATA,
        name: "set_coredump_metadata",
        handler: Handler::Locked(process::sys_set_coredump_metadata),
    },
    SyscallEntry {
        number: numbers::SYS_PLEDGE,
        name: "pledge",
        handler: Handler::Locked(process::sys_pledge),
    },
];

/// Find the table entry for `number`.
pub fn lookup(number: usize) -> Option<&'static SyscallEntry> {
    SYSCALL_TABLE.iter().find(|entry| entry.number == number)
}

/// Dispatch a system call
///
/// # Arguments
/// * `ctx` - Calling process and thread
/// * `frame` - Saved registers; x8 holds the number, x0-x5 the arguments
///
/// # Returns
/// Result value, also placed in x0: the handler's value on success,
/// negative errno on failure
///
/// # Security
/// - Unknown syscall numbers are rejected with ENOSYS
/// - The caller must not hold its big lock; the dispatcher takes it for
///   lock-required handlers and releases it before returning
/// - Each handler checks its pledge and validates its own arguments
pub fn dispatch(ctx: &SyscallContext<'_>, frame: &mut SyscallFrame) -> i64 {
    let number = frame.number();
    let Some(entry) = lookup(number) else {
        log::warn!("[SYSCALL] {}: unknown syscall {:#x}", ctx.process.pid(), number);
        let ret = SyscallError::NoSys as i64;
        frame.set_return(ret);
        return ret;
    };

    let args = frame.args();
    log::trace!(
        "[SYSCALL] {} {:?}: {}({:#x}, {:#x}, {:#x}, {:#x})",
        ctx.process.pid(),
        ctx.tid,
        entry.name,
        args[0],
        args[1],
        args[2],
        args[3]
    );

    let result = match entry.handler {
        Handler::Free(handler) => handler(ctx, &args),
        Handler::Locked(handler) => {
            let mut state = ctx.process.lock(ctx.tid);
            handler(ctx, &mut state, &args)
        }
    };

    if let Err(e) = result {
        log::debug!("[SYSCALL] {}: {} failed: {}", ctx.process.pid(), entry.name, e);
    }

    let ret = encode(result);
    frame.set_return(ret);
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_numbers_are_unique() {
        for (i, a) in SYSCALL_TABLE.iter().enumerate() {
            for b in &SYSCALL_TABLE[i + 1..] {
                assert_ne!(a.number, b.number, "{} and {} collide", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_lock_classification() {
        let policy = |n| lookup(n).map(|e| e.lock_policy());
        assert_eq!(policy(numbers::SYS_GETPID), Some(LockPolicy::Free));
        assert_eq!(policy(numbers::SYS_GETPPID), Some(LockPolicy::Free));
        assert_eq!(policy(numbers::SYS_GET_PROCESS_NAME), Some(LockPolicy::Required));
        assert_eq!(policy(numbers::SYS_SET_PROCESS_NAME), Some(LockPolicy::Required));
        assert_eq!(policy(numbers::SYS_SET_COREDUMP_METADATA), Some(LockPolicy::Required));
        assert_eq!(policy(numbers::SYS_PLEDGE), Some(LockPolicy::Required));
        assert!(lookup(0xFFFF).is_none());
    }

    #[test]
    fn test_frame_registers() {
        let mut frame = SyscallFrame::new(numbers::SYS_PLEDGE, &[1, 2, 3]);
        assert_eq!(frame.number(), numbers::SYS_PLEDGE);
        assert_eq!(frame.args(), [1, 2, 3, 0, 0, 0]);
        frame.set_return(-14);
        assert_eq!(frame.return_value(), -14);
    }
}
