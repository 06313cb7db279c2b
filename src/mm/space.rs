//! User Address Space
//!
//! Per-process map of user pages to their backing frames. This is the
//! interface the memory boundary relies on: page lookups with
//! permissions, and byte access to already-validated ranges.
//!
//! # Design
//! - Pages are keyed by virtual page number in a `BTreeMap`
//! - Each page owns a zero-filled 4 KiB frame
//! - The whole map sits behind one `spin::Mutex`; holding the guard
//!   pins the layout, so a range validated under it cannot change
//!   before the copy that follows
//!
//! # Security Properties
//! - Only addresses inside the user window can be mapped
//! - Every mapping must carry `USER`
//! - Multi-page operations validate every page before changing any

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use super::address::{is_user_range, VirtAddr, PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
use super::paging::{Access, MappingError, PageFlags};

/// Backing storage of one user page.
type Frame = [u8; PAGE_SIZE];

/// A mapped user page.
struct UserPage {
    flags: PageFlags,
    frame: Box<Frame>,
}

/// Virtual page numbers covered by `[start, start + len)`.
///
/// Callers must have checked that the range does not overflow.
fn page_numbers(start: usize, len: usize) -> core::ops::Range<usize> {
    if len == 0 {
        return 0..0;
    }
    let first = start >> PAGE_SHIFT;
    let last = (start + len - 1) >> PAGE_SHIFT;
    first..last + 1
}

/// Split `[start, start + len)` into per-page chunks of
/// `(vpn, offset in page, offset in buffer, chunk length)`.
fn chunks(start: usize, len: usize) -> impl Iterator<Item = (usize, usize, usize, usize)> {
    let mut done = 0;
    core::iter::from_fn(move || {
        if done == len {
            return None;
        }
        let addr = start + done;
        let offset = addr & PAGE_MASK;
        let n = (PAGE_SIZE - offset).min(len - done);
        let chunk = (addr >> PAGE_SHIFT, offset, done, n);
        done += n;
        Some(chunk)
    })
}

/// Page map of one address space, accessed through `AddressSpace::lock`.
pub struct PageMap {
    pages: BTreeMap<usize, UserPage>,
}

impl PageMap {
    const fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }

    /// Look up the flags of the page containing `addr`.
    pub fn translate(&self, addr: VirtAddr) -> Option<PageFlags> {
        self.pages.get(&addr.page_number()).map(|page| page.flags)
    }

    /// Check that every page touched by the range is mapped and allows `access`.
    pub fn check_range(&self, start: usize, len: usize, access: Access) -> Result<(), MappingError> {
        if !is_user_range(start, len) {
            return Err(MappingError::InvalidPermissions);
        }
        for vpn in page_numbers(start, len) {
            match self.pages.get(&vpn) {
                Some(page) if page.flags.permits(access) => {}
                Some(_) => return Err(MappingError::InvalidPermissions),
                None => return Err(MappingError::NotMapped),
            }
        }
        Ok(())
    }

    /// Copy bytes out of mapped pages, ignoring permissions.
    ///
    /// Fails without touching `dst` if any page is missing.
    pub fn read(&self, start: usize, dst: &mut [u8]) -> Result<(), MappingError> {
        if !is_user_range(start, dst.len()) {
            return Err(MappingError::InvalidPermissions);
        }
        if page_numbers(start, dst.len()).any(|vpn| !self.pages.contains_key(&vpn)) {
            return Err(MappingError::NotMapped);
        }
        for (vpn, offset, at, n) in chunks(start, dst.len()) {
            let page = self.pages.get(&vpn).ok_or(MappingError::NotMapped)?;
            dst[at..at + n].copy_from_slice(&page.frame[offset..offset + n]);
        }
        Ok(())
    }

    /// Copy bytes into mapped pages, ignoring permissions.
    ///
    /// Fails without writing anything if any page is missing.
    pub fn write(&mut self, start: usize, src: &[u8]) -> Result<(), MappingError> {
        if !is_user_range(start, src.len()) {
            return Err(MappingError::InvalidPermissions);
        }
        if page_numbers(start, src.len()).any(|vpn| !self.pages.contains_key(&vpn)) {
            return Err(MappingError::NotMapped);
        }
        for (vpn, offset, at, n) in chunks(start, src.len()) {
            let page = self.pages.get_mut(&vpn).ok_or(MappingError::NotMapped)?;
            page.frame[offset..offset + n].copy_from_slice(&src[at..at + n]);
        }
        Ok(())
    }
}

/// A user address space.
pub struct AddressSpace {
    map: Mutex<PageMap>,
}

impl AddressSpace {
    /// Create an empty address space.
    pub const fn new() -> Self {
        Self {
            map: Mutex::new(PageMap::new()),
        }
    }

    /// Validate a `(base, len)` request for page-level operations.
    fn page_range(base: VirtAddr, len: usize) -> Result<core::ops::Range<usize>, MappingError> {
        if !base.is_aligned() || len == 0 {
            return Err(MappingError::MisalignedAddress);
        }
        let rounded = len
            .checked_add(PAGE_MASK)
            .map(|l| l & !PAGE_MASK)
            .ok_or(MappingError::InvalidPermissions)?;
        if !is_user_range(base.as_usize(), rounded) {
            return Err(MappingError::InvalidPermissions);
        }
        Ok(page_numbers(base.as_usize(), rounded))
    }

    /// Map zero-filled pages covering `[base, base + len)`.
    pub fn map(&self, base: VirtAddr, len: usize, flags: PageFlags) -> Result<(), MappingError> {
        if !flags.contains(PageFlags::VALID | PageFlags::USER) {
            return Err(MappingError::InvalidPermissions);
        }
        let range = Self::page_range(base, len)?;
        let mut map = self.map.lock();
        if range.clone().any(|vpn| map.pages.contains_key(&vpn)) {
            return Err(MappingError::AlreadyMapped);
        }
        for vpn in range {
            map.pages.insert(
                vpn,
                UserPage {
                    flags,
                    frame: Box::new([0; PAGE_SIZE]),
                },
            );
        }
        log::trace!("mm: mapped {} +{:#x} {:?}", base, len, flags);
        Ok(())
    }

    /// Unmap every page covering `[base, base + len)`.
    pub fn unmap(&self, base: VirtAddr, len: usize) -> Result<(), MappingError> {
        let range = Self::page_range(base, len)?;
        let mut map = self.map.lock();
        if range.clone().any(|vpn| !map.pages.contains_key(&vpn)) {
            return Err(MappingError::NotMapped);
        }
        for vpn in range {
            map.pages.remove(&vpn);
        }
        log::trace!("mm: unmapped {} +{:#x}", base, len);
        Ok(())
    }

    /// Change the flags of every page covering `[base, base + len)`.
    pub fn protect(&self, base: VirtAddr, len: usize, flags: PageFlags) -> Result<(), MappingError> {
        if !flags.contains(PageFlags::VALID | PageFlags::USER) {
            return Err(MappingError::InvalidPermissions);
        }
        let range = Self::page_range(base, len)?;
        let mut map = self.map.lock();
        if range.clone().any(|vpn| !map.pages.contains_key(&vpn)) {
            return Err(MappingError::NotMapped);
        }
        for vpn in range {
            if let Some(page) = map.pages.get_mut(&vpn) {
                page.flags = flags;
            }
        }
        Ok(())
    }

    /// Look up the flags of the page containing `addr`.
    pub fn translate(&self, addr: VirtAddr) -> Option<PageFlags> {
        self.map.lock().translate(addr)
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.map.lock().pages.len()
    }

    /// Load bytes into mapped pages regardless of their permissions.
    ///
    /// Used by the program loader to populate read-only segments.
    pub fn load(&self, addr: VirtAddr, bytes: &[u8]) -> Result<(), MappingError> {
        self.map.lock().write(addr.as_usize(), bytes)
    }

    /// Copy a range of mapped memory out for a core dump.
    pub fn dump(&self, addr: VirtAddr, len: usize) -> Result<Vec<u8>, MappingError> {
        let mut out = vec![0; len];
        self.map.lock().read(addr.as_usize(), &mut out)?;
        Ok(out)
    }

    /// Lock the page map for a validate-then-copy sequence.
    pub(crate) fn lock(&self) -> MutexGuard<'_, PageMap> {
        self.map.lock()
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AddressSpace({} pages)", self.mapped_pages())
    }
}
