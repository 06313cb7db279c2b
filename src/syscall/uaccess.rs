//! User/Kernel Memory Boundary
//!
//! The only code allowed to touch memory named by user-supplied pointers.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Buffer overflows (hard length ceiling, overflow checks)
//!   - TOCTOU races (validation and copy run under one page-map lock)
//!   - Null pointer dereference (explicit checks)
//!   - Partial copies (every page is checked before the first byte moves)

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::mm::address::{is_user_range, KIB};
use crate::mm::{Access, AddressSpace, MappingError};

use super::error::{SyscallError, SyscallResult};

/// Upper bound on any single copy across the boundary.
pub const MAX_USER_COPY: usize = 64 * KIB;

/// An untrusted address supplied by user space.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct UserPtr(usize);

impl UserPtr {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Wrap a raw register value.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address.
    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Check for null.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for UserPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPtr({:#x})", self.0)
    }
}

/// A user range that passed the static checks.
///
/// Page mappings are still checked at copy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRange {
    start: usize,
    len: usize,
}

impl UserRange {
    /// Start address.
    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Length in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the range is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Validate a user range without touching memory.
///
/// # Security Checks
/// 1. Length is within `MAX_USER_COPY`
/// 2. Zero-length ranges are accepted without further checks
/// 3. Pointer is not null
/// 4. Pointer + length doesn't overflow
/// 5. The whole range is within the user window
pub fn validate_user_range(ptr: UserPtr, len: usize) -> SyscallResult<UserRange> {
    if len > MAX_USER_COPY {
        return Err(SyscallError::ResourceExceeded);
    }

    if len == 0 {
        return Ok(UserRange {
            start: ptr.addr(),
            len: 0,
        });
    }

    if ptr.is_null() {
        return Err(SyscallError::MemoryFault);
    }

    if !is_user_range(ptr.addr(), len) {
        return Err(SyscallError::MemoryFault);
    }

    Ok(UserRange {
        start: ptr.addr(),
        len,
    })
}

fn fault(op: &str, range: UserRange, err: MappingError) -> SyscallError {
    log::debug!(
        "uaccess: {} {:#x}+{:#x} failed: {}",
        op,
        range.start,
        range.len,
        err
    );
    SyscallError::MemoryFault
}

/// Copy `dst.len()` bytes from user memory at `src` into `dst`.
///
/// On failure `dst` is left unmodified.
pub fn copy_from_user(space: &AddressSpace, dst: &mut [u8], src: UserPtr) -> SyscallResult<()> {
    let range = validate_user_range(src, dst.len())?;
    if range.is_empty() {
        return Ok(());
    }

    let map = space.lock();
    map.check_range(range.start, range.len, Access::Read)
        .map_err(|e| fault("read", range, e))?;
    map.read(range.start, dst).map_err(|e| fault("read", range, e))
}

/// Copy `src` into user memory at `dst`.
///
/// On failure no user byte is written.
pub fn copy_to_user(space: &AddressSpace, dst: UserPtr, src: &[u8]) -> SyscallResult<()> {
    let range = validate_user_range(dst, src.len())?;
    if range.is_empty() {
        return Ok(());
    }

    let mut map = space.lock();
    map.check_range(range.start, range.len, Access::Write)
        .map_err(|e| fault("write", range, e))?;
    map.write(range.start, src).map_err(|e| fault("write", range, e))
}

/// Copy exactly `len` bytes of user memory into a new buffer.
///
/// Unlike `copy_string_from_user` embedded NULs are kept.
pub fn copy_bytes_from_user(space: &AddressSpace, ptr: UserPtr, len: usize) -> SyscallResult<Vec<u8>> {
    if len > MAX_USER_COPY {
        return Err(SyscallError::ResourceExceeded);
    }
    let mut bytes = vec![0; len];
    copy_from_user(space, &mut bytes, ptr)?;
    Ok(bytes)
}

/// Copy a bounded byte string of `len` bytes from user memory.
///
/// The result stops at the first NUL inside the range, if any; no
/// terminator is assumed. A null pointer always faults, even for
/// `len == 0`, so a failed copy is never confused with an empty string.
pub fn copy_string_from_user(space: &AddressSpace, ptr: UserPtr, len: usize) -> SyscallResult<Vec<u8>> {
    if len > MAX_USER_COPY {
        return Err(SyscallError::ResourceExceeded);
    }
    if ptr.is_null() {
        return Err(SyscallError::MemoryFault);
    }

    let mut bytes = vec![0; len];
    copy_from_user(space, &mut bytes, ptr)?;
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::{PageFlags, VirtAddr, PAGE_SIZE, USER_END, USER_START};

    fn space_with(flags: PageFlags, pages: usize) -> AddressSpace {
        let space = AddressSpace::new();
        space.map(VirtAddr::new(USER_START), pages * PAGE_SIZE, flags).unwrap();
        space
    }

    #[test]
    fn test_zero_length() {
        assert!(validate_user_range(UserPtr::new(USER_START), 0).is_ok());
        let space = AddressSpace::new();
        assert!(copy_from_user(&space, &mut [], UserPtr::new(USER_START)).is_ok());
    }

    #[test]
    fn test_null_pointer() {
        assert_eq!(
            validate_user_range(UserPtr::NULL, 100),
            Err(SyscallError::MemoryFault)
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            validate_user_range(UserPtr::new(usize::MAX - 10), 100),
            Err(SyscallError::MemoryFault)
        );
        assert_eq!(
            validate_user_range(UserPtr::new(USER_END - 10), 100),
            Err(SyscallError::MemoryFault)
        );
    }

    #[test]
    fn test_ceiling_checked_first() {
        assert_eq!(
            validate_user_range(UserPtr::NULL, MAX_USER_COPY + 1),
            Err(SyscallError::ResourceExceeded)
        );
    }

    #[test]
    fn test_copy_from_user_roundtrip() {
        let space = space_with(PageFlags::USER_DATA, 1);
        copy_to_user(&space, UserPtr::new(USER_START + 8), b"hello").unwrap();
        let mut out = [0u8; 5];
        copy_from_user(&space, &mut out, UserPtr::new(USER_START + 8)).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn test_read_past_mapping_leaves_dst_untouched() {
        let space = space_with(PageFlags::USER_DATA, 1);
        space.load(VirtAddr::new(USER_START + PAGE_SIZE - 4), b"tail").unwrap();

        let mut dst = [0xAAu8; 8];
        let src = UserPtr::new(USER_START + PAGE_SIZE - 4);
        assert_eq!(
            copy_from_user(&space, &mut dst, src),
            Err(SyscallError::MemoryFault)
        );
        assert_eq!(dst, [0xAA; 8]);
    }

    #[test]
    fn test_write_to_readonly_faults_without_partial_write() {
        let space = AddressSpace::new();
        space
            .map(VirtAddr::new(USER_START), PAGE_SIZE, PageFlags::USER_DATA)
            .unwrap();
        space
            .map(VirtAddr::new(USER_START + PAGE_SIZE), PAGE_SIZE, PageFlags::USER_RODATA)
            .unwrap();

        let dst = UserPtr::new(USER_START + PAGE_SIZE - 2);
        assert_eq!(
            copy_to_user(&space, dst, b"abcd"),
            Err(SyscallError::MemoryFault)
        );
        assert_eq!(
            space.dump(VirtAddr::new(USER_START + PAGE_SIZE - 2), 4).unwrap(),
            [0, 0, 0, 0]
        );
    }

    #[test]
    fn test_kernel_only_page_faults() {
        let space = space_with(PageFlags::USER_DATA, 1);
        let mut out = [0u8; 4];
        assert_eq!(
            copy_from_user(&space, &mut out, UserPtr::new(USER_START + 2 * PAGE_SIZE)),
            Err(SyscallError::MemoryFault)
        );
    }

    #[test]
    fn test_copy_string() {
        let space = space_with(PageFlags::USER_RODATA, 1);
        space.load(VirtAddr::new(USER_START), b"worker\0junk").unwrap();

        let s = copy_string_from_user(&space, UserPtr::new(USER_START), 11).unwrap();
        assert_eq!(s, b"worker");

        let s = copy_string_from_user(&space, UserPtr::new(USER_START), 3).unwrap();
        assert_eq!(s, b"wor");

        let empty = copy_string_from_user(&space, UserPtr::new(USER_START), 0).unwrap();
        assert!(empty.is_empty());

        assert_eq!(
            copy_string_from_user(&space, UserPtr::NULL, 0),
            Err(SyscallError::MemoryFault)
        );
        assert_eq!(
            copy_string_from_user(&space, UserPtr::new(USER_START), MAX_USER_COPY + 1),
            Err(SyscallError::ResourceExceeded)
        );
    }

    #[test]
    fn test_copy_bytes_keeps_nuls() {
        let space = space_with(PageFlags::USER_RODATA, 1);
        space.load(VirtAddr::new(USER_START), b"a\0b").unwrap();
        let bytes = copy_bytes_from_user(&space, UserPtr::new(USER_START), 3).unwrap();
        assert_eq!(bytes, b"a\0b");
    }
}
