//! Process Identity and State
//!
//! # Process Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Process                           │
//! ├──────────────────────────────────────────────────────────┤
//! │  pid, ppid: Pid            - immutable, read lock-free   │
//! │  pledge: Pledge            - atomic, narrowed under lock │
//! │  space: AddressSpace       - user pages                  │
//! │  state: BigLock<ProcessState>                            │
//! │     name: ProcessName                                    │
//! │     coredump: CoredumpMetadata                           │
//! └──────────────────────────────────────────────────────────┘
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cap::{Pledge, PledgeMask};
use crate::mm::AddressSpace;
use crate::sync::{BigLock, BigLockGuard, ThreadId};
use crate::syscall::{SyscallError, SyscallResult};

use super::coredump::CoredumpMetadata;

/// Maximum size of a process name including its terminator.
pub const MAX_PROCESS_NAME: usize = 256;

/// A process identifier.
///
/// Pid 0 stands for the kernel and only ever appears as the parent of
/// a root process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    /// The kernel's pid.
    pub const KERNEL: Self = Self(0);

    /// Create a pid.
    #[inline]
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }

    /// Get the raw pid.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated process name.
///
/// Never empty, never whitespace-only, and short enough that the name
/// plus a NUL fits in `MAX_PROCESS_NAME` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessName(Vec<u8>);

impl ProcessName {
    /// Validate raw bytes as a process name.
    pub fn new(bytes: Vec<u8>) -> SyscallResult<Self> {
        if bytes.len() + 1 > MAX_PROCESS_NAME {
            return Err(SyscallError::ResourceExceeded);
        }
        // Empty and whitespace-only names only exist to confuse users.
        if bytes
            .iter()
            .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r'))
        {
            return Err(SyscallError::InvalidArgument);
        }
        Ok(Self(bytes))
    }

    /// Name bytes, without terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes, without terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the name is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy text form for logging.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

/// Mutable process state, only reachable through the big lock.
#[derive(Debug)]
pub struct ProcessState {
    name: ProcessName,
    coredump: CoredumpMetadata,
}

impl ProcessState {
    /// Current name.
    pub fn name(&self) -> &ProcessName {
        &self.name
    }

    /// Replace the name.
    pub fn set_name(&mut self, name: ProcessName) {
        self.name = name;
    }

    /// Coredump metadata.
    pub fn coredump(&self) -> &CoredumpMetadata {
        &self.coredump
    }

    /// Coredump metadata, for appending.
    pub fn coredump_mut(&mut self) -> &mut CoredumpMetadata {
        &mut self.coredump
    }
}

/// A process.
pub struct Process {
    pid: Pid,
    ppid: Pid,
    pledge: Pledge,
    space: AddressSpace,
    state: BigLock<ProcessState>,
}

impl Process {
    /// Create a process. Called by the process table only.
    pub(crate) fn new(
        pid: Pid,
        ppid: Pid,
        name: ProcessName,
        promises: PledgeMask,
        space: AddressSpace,
    ) -> Self {
        Self {
            pid,
            ppid,
            pledge: Pledge::new(promises),
            space,
            state: BigLock::new(ProcessState {
                name,
                coredump: CoredumpMetadata::new(),
            }),
        }
    }

    /// Process id.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Parent process id, possibly of a process that has exited.
    #[inline]
    pub fn ppid(&self) -> Pid {
        self.ppid
    }

    /// Pledge state.
    #[inline]
    pub fn pledge(&self) -> &Pledge {
        &self.pledge
    }

    /// User address space.
    #[inline]
    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// The big lock guarding `ProcessState`.
    #[inline]
    pub fn big_lock(&self) -> &BigLock<ProcessState> {
        &self.state
    }

    /// Acquire the big lock on behalf of `tid`.
    pub fn lock(&self, tid: ThreadId) -> BigLockGuard<'_, ProcessState> {
        self.state.lock(tid)
    }

    /// Narrow this process's pledge to its intersection with `requested`.
    ///
    /// # Panics
    /// Panics in debug mode if `held` guards another process's lock.
    pub fn narrow_pledge(
        &self,
        requested: PledgeMask,
        held: &BigLockGuard<'_, ProcessState>,
    ) -> PledgeMask {
        debug_assert!(
            held.guards(&self.state),
            "pledge of {} narrowed without its big lock",
            self.pid
        );
        self.pledge.narrow(requested, held)
    }

    /// Whether `tid` currently holds this process's big lock.
    #[inline]
    pub fn is_big_lock_held_by(&self, tid: ThreadId) -> bool {
        self.state.is_held_by(tid)
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("ppid", &self.ppid)
            .field("pledge", &self.pledge.mask())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_name_validation() {
        assert_eq!(ProcessName::new(Vec::new()), Err(SyscallError::InvalidArgument));
        assert_eq!(
            ProcessName::new(b" \t\n ".to_vec()),
            Err(SyscallError::InvalidArgument)
        );
        assert_eq!(
            ProcessName::new(b"\x0b\x0c\r".to_vec()),
            Err(SyscallError::InvalidArgument)
        );
        assert_eq!(
            ProcessName::new(vec![b'a'; MAX_PROCESS_NAME]),
            Err(SyscallError::ResourceExceeded)
        );
        let name = ProcessName::new(vec![b'a'; MAX_PROCESS_NAME - 1]).unwrap();
        assert_eq!(name.len(), 255);
        let name = ProcessName::new(b" worker-1 ".to_vec()).unwrap();
        assert_eq!(name.as_bytes(), b" worker-1 ");
    }

    #[test]
    fn test_state_behind_big_lock() {
        let process = Process::new(
            Pid::new(5),
            Pid::new(1),
            ProcessName::new(b"init".to_vec()).unwrap(),
            PledgeMask::all(),
            AddressSpace::new(),
        );
        let tid = ThreadId::new(1);
        assert!(!process.is_big_lock_held_by(tid));
        {
            let mut state = process.lock(tid);
            assert!(process.is_big_lock_held_by(tid));
            state.set_name(ProcessName::new(b"renamed".to_vec()).unwrap());
        }
        assert_eq!(process.lock(tid).name().as_bytes(), b"renamed");
        assert_eq!(process.pid(), Pid::new(5));
        assert_eq!(process.ppid(), Pid::new(1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "narrowed without its big lock")]
    fn test_narrow_with_foreign_guard_is_fatal() {
        let new = |pid| {
            Process::new(
                Pid::new(pid),
                Pid::KERNEL,
                ProcessName::new(b"p".to_vec()).unwrap(),
                PledgeMask::all(),
                AddressSpace::new(),
            )
        };
        let (a, b) = (new(1), new(2));
        let guard_a = a.lock(ThreadId::new(1));
        b.narrow_pledge(PledgeMask::STDIO, &guard_a);
    }
}
