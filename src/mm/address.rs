//! Virtual Address Types
//!
//! Type-safe wrapper for page-granular addresses in a user address space,
//! plus the layout constants the memory boundary validates against.
//!
//! # Security Properties
//! - Virtual addresses require explicit unsafe conversion to pointers
//! - The user window is a fixed, kernel-defined range

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// One kibibyte.
pub const KIB: usize = 1024;

/// Lowest user-accessible address.
/// The first 64 KiB stay unmapped so small bogus pointers always fault.
pub const USER_START: usize = 0x0000_0000_0001_0000;

/// End of the user window (exclusive): the 48-bit TTBR0 half.
pub const USER_END: usize = 0x0001_0000_0000_0000;

/// A virtual memory address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Get the virtual page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Create from a virtual page number.
    #[inline]
    pub const fn from_page_number(vpn: usize) -> Self {
        Self(vpn << PAGE_SHIFT)
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Check if this address lies inside the user window.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 >= USER_START && self.0 < USER_END
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#018x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Whether `[start, start + len)` fits entirely inside the user window.
///
/// Zero-length ranges are accepted anywhere in the window.
#[inline]
pub const fn is_user_range(start: usize, len: usize) -> bool {
    if start < USER_START || start >= USER_END {
        return false;
    }
    match start.checked_add(len) {
        Some(end) => end <= USER_END,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_window() {
        assert!(VirtAddr::new(USER_START).is_user());
        assert!(!VirtAddr::new(0).is_user());
        assert!(!VirtAddr::new(USER_END).is_user());
    }

    #[test]
    fn test_page_alignment() {
        let addr = VirtAddr::new(0x4008_1234);
        assert!(!addr.is_aligned());
        assert_eq!(addr.align_down().as_usize(), 0x4008_1000);
        assert_eq!(addr.page_offset(), 0x234);
        assert_eq!(VirtAddr::from_page_number(addr.page_number()), addr.align_down());
    }

    #[test]
    fn test_user_range_rejects_overflow() {
        assert!(is_user_range(USER_START, PAGE_SIZE));
        assert!(is_user_range(USER_END - 1, 1));
        assert!(!is_user_range(USER_END - 1, 2));
        assert!(!is_user_range(USER_START, usize::MAX));
    }
}
