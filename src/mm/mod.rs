//! Memory management module
//!
//! Provides:
//! - User address space page maps (the VM interface the syscall gate uses)
//! - Page permission flags
//! - Kernel heap allocation on bare-metal targets
//!
//! # Security Principles
//! - All user ranges are bounds-checked against the user window
//! - Pages are zero-filled before they become visible to user space
//! - Unsafe code is minimal and audited

pub mod address;
#[cfg(target_os = "none")]
mod allocator;
pub mod paging;
pub mod space;

pub use address::{VirtAddr, KIB, PAGE_SIZE, USER_END, USER_START};
#[cfg(target_os = "none")]
pub use allocator::heap_size;
#[cfg(target_os = "none")]
pub(crate) use allocator::init_heap;
pub use paging::{Access, MappingError, PageFlags};
pub use space::AddressSpace;
