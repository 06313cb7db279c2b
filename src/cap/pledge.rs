//! Pledge Promises
//!
//! Defines the closed set of promise categories and the per-process
//! pledge state consulted by every privileged syscall.
//!
//! # Pledge Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Pledge                            │
//! ├──────────────────────────────────────────────────────────┤
//! │  bits: AtomicU32     - one bit per Promise               │
//! │                        read lock-free, narrowed under    │
//! │                        the process big lock              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Security Properties
//! - The mask only ever shrinks: narrowing is an atomic AND
//! - There is no API that sets a bit after construction
//! - Unknown promise names are rejected, never ignored

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

use crate::proc::ProcessState;
use crate::sync::BigLockGuard;
use crate::syscall::{SyscallError, SyscallResult};

/// A single promise category.
///
/// The discriminant is the bit index inside `PledgeMask`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum Promise {
    Stdio = 0,
    Rpath = 1,
    Wpath = 2,
    Cpath = 3,
    Dpath = 4,
    Inet = 5,
    Id = 6,
    Proc = 7,
    Ptrace = 8,
    Exec = 9,
    Unix = 10,
    Recvfd = 11,
    Sendfd = 12,
    Fattr = 13,
    Tty = 14,
    Chown = 15,
    Thread = 16,
    Video = 17,
    Accept = 18,
    Settime = 19,
    Sigaction = 20,
    ProtExec = 21,
    MapFixed = 22,
}

impl Promise {
    /// Every promise, in bit order.
    pub const ALL: [Promise; 23] = [
        Promise::Stdio,
        Promise::Rpath,
        Promise::Wpath,
        Promise::Cpath,
        Promise::Dpath,
        Promise::Inet,
        Promise::Id,
        Promise::Proc,
        Promise::Ptrace,
        Promise::Exec,
        Promise::Unix,
        Promise::Recvfd,
        Promise::Sendfd,
        Promise::Fattr,
        Promise::Tty,
        Promise::Chown,
        Promise::Thread,
        Promise::Video,
        Promise::Accept,
        Promise::Settime,
        Promise::Sigaction,
        Promise::ProtExec,
        Promise::MapFixed,
    ];

    /// The name user space uses for this promise.
    pub const fn name(self) -> &'static str {
        match self {
            Promise::Stdio => "stdio",
            Promise::Rpath => "rpath",
            Promise::Wpath => "wpath",
            Promise::Cpath => "cpath",
            Promise::Dpath => "dpath",
            Promise::Inet => "inet",
            Promise::Id => "id",
            Promise::Proc => "proc",
            Promise::Ptrace => "ptrace",
            Promise::Exec => "exec",
            Promise::Unix => "unix",
            Promise::Recvfd => "recvfd",
            Promise::Sendfd => "sendfd",
            Promise::Fattr => "fattr",
            Promise::Tty => "tty",
            Promise::Chown => "chown",
            Promise::Thread => "thread",
            Promise::Video => "video",
            Promise::Accept => "accept",
            Promise::Settime => "settime",
            Promise::Sigaction => "sigaction",
            Promise::ProtExec => "prot_exec",
            Promise::MapFixed => "map_fixed",
        }
    }

    /// Look up a promise by its user-space name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name().as_bytes() == name)
    }

    /// The single-bit mask for this promise.
    #[inline]
    pub const fn mask(self) -> PledgeMask {
        PledgeMask::from_bits_retain(1 << self as u32)
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of promises, one bit per `Promise`.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct PledgeMask: u32 {
        const STDIO = 1 << Promise::Stdio as u32;
        const RPATH = 1 << Promise::Rpath as u32;
        const WPATH = 1 << Promise::Wpath as u32;
        const CPATH = 1 << Promise::Cpath as u32;
        const DPATH = 1 << Promise::Dpath as u32;
        const INET = 1 << Promise::Inet as u32;
        const ID = 1 << Promise::Id as u32;
        const PROC = 1 << Promise::Proc as u32;
        const PTRACE = 1 << Promise::Ptrace as u32;
        const EXEC = 1 << Promise::Exec as u32;
        const UNIX = 1 << Promise::Unix as u32;
        const RECVFD = 1 << Promise::Recvfd as u32;
        const SENDFD = 1 << Promise::Sendfd as u32;
        const FATTR = 1 << Promise::Fattr as u32;
        const TTY = 1 << Promise::Tty as u32;
        const CHOWN = 1 << Promise::Chown as u32;
        const THREAD = 1 << Promise::Thread as u32;
        const VIDEO = 1 << Promise::Video as u32;
        const ACCEPT = 1 << Promise::Accept as u32;
        const SETTIME = 1 << Promise::Settime as u32;
        const SIGACTION = 1 << Promise::Sigaction as u32;
        const PROT_EXEC = 1 << Promise::ProtExec as u32;
        const MAP_FIXED = 1 << Promise::MapFixed as u32;
    }
}

impl PledgeMask {
    /// Parse a whitespace-separated list of promise names.
    ///
    /// An empty list yields the empty mask. Any name the kernel does not
    /// know fails the whole parse with `InvalidArgument`.
    pub fn parse(names: &[u8]) -> SyscallResult<Self> {
        Self::parse_with(names, |b| b.is_ascii_whitespace())
    }

    /// Parse a list of promise names split on `sep`.
    pub fn parse_with(names: &[u8], sep: impl Fn(&u8) -> bool) -> SyscallResult<Self> {
        let mut mask = PledgeMask::empty();
        for token in names.split(sep).filter(|t| !t.is_empty()) {
            match Promise::from_name(token) {
                Some(promise) => mask |= promise.mask(),
                None => {
                    log::debug!(
                        "pledge: unknown promise {:?}",
                        core::str::from_utf8(token).unwrap_or("<non-utf8>")
                    );
                    return Err(SyscallError::InvalidArgument);
                }
            }
        }
        Ok(mask)
    }

    /// Check whether a single promise is present.
    #[inline]
    pub const fn has(self, promise: Promise) -> bool {
        self.contains(promise.mask())
    }

    /// Iterate over the promises present in this mask.
    pub fn promises(self) -> impl Iterator<Item = Promise> {
        Promise::ALL.into_iter().filter(move |p| self.has(*p))
    }
}

/// Per-process pledge state.
///
/// Starts from an initial mask handed out at process creation and can
/// only narrow from there.
#[derive(Debug)]
pub struct Pledge {
    bits: AtomicU32,
}

impl Pledge {
    /// Create pledge state with the given initial grant.
    pub const fn new(initial: PledgeMask) -> Self {
        Self {
            bits: AtomicU32::new(initial.bits()),
        }
    }

    /// Unrestricted pledge state (no pledge made yet).
    pub const fn unrestricted() -> Self {
        Self::new(PledgeMask::all())
    }

    /// Snapshot of the current mask.
    #[inline]
    pub fn mask(&self) -> PledgeMask {
        PledgeMask::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    /// Check whether `promise` is still held.
    #[inline]
    pub fn check(&self, promise: Promise) -> bool {
        self.mask().has(promise)
    }

    /// Gate for privileged operations.
    ///
    /// Handlers call this before touching user memory or process state.
    pub fn require(&self, promise: Promise) -> SyscallResult<()> {
        if self.check(promise) {
            Ok(())
        } else {
            log::debug!("pledge: promise '{}' not held", promise);
            Err(SyscallError::PermissionDenied)
        }
    }

    /// Narrow the mask to its intersection with `requested`.
    ///
    /// Promises in `requested` that are not currently held stay absent.
    /// Returns the resulting mask. Reached through
    /// `Process::narrow_pledge`, which checks that `_held` guards the
    /// owning process.
    pub(crate) fn narrow(
        &self,
        requested: PledgeMask,
        _held: &BigLockGuard<'_, ProcessState>,
    ) -> PledgeMask {
        let previous = self.bits.fetch_and(requested.bits(), Ordering::AcqRel);
        PledgeMask::from_bits_truncate(previous & requested.bits())
    }
}

impl Default for Pledge {
    fn default() -> Self {
        Self::unrestricted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::AddressSpace;
    use crate::proc::{Pid, Process, ProcessName};
    use crate::sync::ThreadId;

    fn process() -> Process {
        Process::new(
            Pid::new(1),
            Pid::KERNEL,
            ProcessName::new(b"init".to_vec()).unwrap(),
            PledgeMask::all(),
            AddressSpace::new(),
        )
    }

    #[test]
    fn test_full_grant_checks_every_promise() {
        let pledge = Pledge::unrestricted();
        for promise in Promise::ALL {
            assert!(pledge.check(promise), "{} missing", promise);
        }
    }

    #[test]
    fn test_empty_pledge_denies_everything() {
        let process = process();
        let pledge = process.pledge();
        let guard = process.lock(ThreadId::new(1));
        process.narrow_pledge(PledgeMask::empty(), &guard);
        for promise in Promise::ALL {
            assert!(!pledge.check(promise));
            assert_eq!(pledge.require(promise), Err(SyscallError::PermissionDenied));
        }
    }

    #[test]
    fn test_narrowing_is_monotonic() {
        let process = process();
        let pledge = process.pledge();
        let guard = process.lock(ThreadId::new(1));

        let first = process.narrow_pledge(PledgeMask::STDIO | PledgeMask::PROC, &guard);
        assert_eq!(first, PledgeMask::STDIO | PledgeMask::PROC);

        // Asking for a dropped promise does not bring it back.
        let second = process.narrow_pledge(PledgeMask::STDIO | PledgeMask::INET, &guard);
        assert_eq!(second, PledgeMask::STDIO);
        assert!(!pledge.check(Promise::Inet));
        assert!(!pledge.check(Promise::Proc));

        let sequence = [
            PledgeMask::all(),
            PledgeMask::PROC | PledgeMask::EXEC,
            PledgeMask::STDIO | PledgeMask::ID,
        ];
        let mut previous = pledge.mask();
        for request in sequence {
            let now = process.narrow_pledge(request, &guard);
            assert!(previous.contains(now));
            previous = now;
        }
    }

    #[test]
    fn test_parse_names() {
        let mask = PledgeMask::parse(b"stdio  proc\tinet").unwrap();
        assert_eq!(mask, PledgeMask::STDIO | PledgeMask::PROC | PledgeMask::INET);
        assert_eq!(PledgeMask::parse(b"").unwrap(), PledgeMask::empty());
        assert_eq!(PledgeMask::parse(b"   ").unwrap(), PledgeMask::empty());
    }

    #[test]
    fn test_parse_unknown_promise_fails_closed() {
        assert_eq!(
            PledgeMask::parse(b"stdio teleport"),
            Err(SyscallError::InvalidArgument)
        );
        assert_eq!(PledgeMask::parse(b"STDIO"), Err(SyscallError::InvalidArgument));
    }

    #[test]
    fn test_name_roundtrip_for_all_promises() {
        for promise in Promise::ALL {
            assert_eq!(Promise::from_name(promise.name().as_bytes()), Some(promise));
        }
        assert_eq!(PledgeMask::all().promises().count(), Promise::ALL.len());
    }
}
