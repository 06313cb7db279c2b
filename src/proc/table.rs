//! Process Table
//!
//! Owns every live process. Processes refer to each other only by pid;
//! a parent is found by looking it up here, which simply fails once the
//! parent has exited.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::RwLock;

use crate::cap::PledgeMask;
use crate::mm::AddressSpace;
use crate::sync::ThreadId;
use crate::syscall::{SyscallError, SyscallResult};

use super::coredump::CoredumpWriter;
use super::process::{Pid, Process, ProcessName};

/// Table of live processes keyed by pid.
pub struct ProcessTable {
    next_pid: AtomicU32,
    root_promises: PledgeMask,
    processes: RwLock<BTreeMap<Pid, Arc<Process>>>,
}

impl ProcessTable {
    /// Create an empty table. Root processes start with `root_promises`.
    pub const fn new(root_promises: PledgeMask) -> Self {
        Self {
            next_pid: AtomicU32::new(1),
            root_promises,
            processes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a process.
    ///
    /// A child inherits its parent's current promises. Without a parent
    /// the process is a root process whose ppid is `Pid::KERNEL`.
    ///
    /// # Errors
    /// - `NoSuchProcess` if `parent` is not live
    /// - `InvalidArgument` / `ResourceExceeded` for a bad name
    pub fn spawn(
        &self,
        parent: Option<Pid>,
        name: &[u8],
        space: AddressSpace,
    ) -> SyscallResult<Arc<Process>> {
        let name = ProcessName::new(name.to_vec())?;
        let (ppid, promises) = match parent {
            Some(ppid) => {
                let parent = self.get(ppid).ok_or(SyscallError::NoSuchProcess)?;
                (ppid, parent.pledge().mask())
            }
            None => (Pid::KERNEL, self.root_promises),
        };

        let pid = Pid::new(self.next_pid.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "proc: spawned {} ({}) parent {} promises {:?}",
            pid,
            name.to_string_lossy(),
            ppid,
            promises
        );
        let process = Arc::new(Process::new(pid, ppid, name, promises, space));
        self.processes.write().insert(pid, process.clone());
        Ok(process)
    }

    /// Look up a live process.
    pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
        self.processes.read().get(&pid).cloned()
    }

    /// Look up the parent of `pid`, if both are still live.
    pub fn parent_of(&self, pid: Pid) -> Option<Arc<Process>> {
        let ppid = self.get(pid)?.ppid();
        self.get(ppid)
    }

    /// Pids of all live processes, ascending.
    pub fn pids(&self) -> Vec<Pid> {
        self.processes.read().keys().copied().collect()
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        self.processes.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.read().is_empty()
    }

    /// Tear down an exiting process.
    ///
    /// When `dump` is given the process's name and coredump metadata are
    /// handed to it before the process is dropped. `tid` is the exiting
    /// thread, which takes the big lock to read the final state.
    pub fn exit(
        &self,
        pid: Pid,
        tid: ThreadId,
        dump: Option<&mut dyn CoredumpWriter>,
    ) -> SyscallResult<()> {
        let process = self
            .processes
            .write()
            .remove(&pid)
            .ok_or(SyscallError::NoSuchProcess)?;

        if let Some(writer) = dump {
            let state = process.lock(tid);
            writer.write(pid, state.name().as_bytes(), state.coredump());
        }
        log::debug!("proc: {} exited", pid);
        Ok(())
    }
}
