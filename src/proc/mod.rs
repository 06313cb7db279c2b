//! Process management
//!
//! Process identity, the state a syscall handler may touch once the gate
//! has passed, and the table that owns every live process.
//!
//! # Security Properties
//! - `pid`/`ppid` are immutable and readable without locking
//! - Name and coredump metadata are only reachable through the big lock
//! - Processes never hold references to each other, only pids

pub mod coredump;
pub mod process;
pub mod table;

pub use coredump::{CoredumpMetadata, CoredumpWriter, MAX_COREDUMP_ENTRIES, MAX_COREDUMP_FIELD};
pub use process::{Pid, Process, ProcessName, ProcessState, MAX_PROCESS_NAME};
pub use table::ProcessTable;
