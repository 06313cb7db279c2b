//! Kernel Heap Allocator
//!
//! Uses `linked_list_allocator` for heap management. Process names,
//! coredump metadata and page frames all live on this heap.
//!
//! # Security Considerations
//! - Heap is initialized once during boot
//! - All allocations go through Rust's global allocator
//! - linked_list_allocator provides bounds checking

use linked_list_allocator::LockedHeap;

/// Global heap allocator instance
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Heap size: 4 MiB, enough for the process table and user frames
/// of a handful of processes.
const HEAP_SIZE: usize = 4 * 1024 * 1024;

/// Static heap memory region
static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initialize the kernel heap
///
/// Must run exactly once, before any heap allocation. `crate::init`
/// guarantees this with a `spin::Once`.
pub(crate) fn init_heap() {
    // SAFETY:
    // - HEAP_MEMORY is a valid static array
    // - Callers serialize through crate::init, so this runs once
    // - No other code accesses HEAP_MEMORY directly
    unsafe {
        let heap_start = (&raw mut HEAP_MEMORY).cast::<u8>();
        ALLOCATOR.lock().init(heap_start, HEAP_SIZE);
    }
}

/// Get the size of the kernel heap
pub fn heap_size() -> usize {
    HEAP_SIZE
}
