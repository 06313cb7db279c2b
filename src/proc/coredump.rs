//! Coredump Metadata
//!
//! Free-form key/value annotations a process attaches to itself for
//! inclusion in a post-crash dump.
//!
//! # Design
//! - Entries keep insertion order
//! - Setting an existing key replaces its value in place
//! - Sizes are bounded per field and in number of keys

use alloc::vec::Vec;

use crate::mm::KIB;
use crate::syscall::{SyscallError, SyscallResult};

use super::Pid;

/// Maximum length of a key or value in bytes.
pub const MAX_COREDUMP_FIELD: usize = 16 * KIB;

/// Maximum number of distinct keys per process.
pub const MAX_COREDUMP_ENTRIES: usize = 16;

/// Ordered key/value metadata of one process.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoredumpMetadata {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CoredumpMetadata {
    /// Create empty metadata.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace `key`.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty key
    /// - `ResourceExceeded` if a field is too long or the table is full
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> SyscallResult<()> {
        if key.is_empty() {
            return Err(SyscallError::InvalidArgument);
        }
        if key.len() > MAX_COREDUMP_FIELD || value.len() > MAX_COREDUMP_FIELD {
            return Err(SyscallError::ResourceExceeded);
        }

        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return Ok(());
        }
        if self.entries.len() >= MAX_COREDUMP_ENTRIES {
            return Err(SyscallError::ResourceExceeded);
        }
        self.entries.push((key, value));
        Ok(())
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no metadata has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Consumer of a dying process's metadata.
///
/// Implemented by the coredump writer; the dump format is its business.
pub trait CoredumpWriter {
    /// Write the dump for process `pid` named `name`.
    fn write(&mut self, pid: Pid, name: &[u8], metadata: &CoredumpMetadata);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_insertion_order() {
        let mut meta = CoredumpMetadata::new();
        meta.set(b"build".to_vec(), b"release".to_vec()).unwrap();
        meta.set(b"arch".to_vec(), b"x86_64".to_vec()).unwrap();
        let entries: Vec<_> = meta.iter().collect();
        assert_eq!(
            entries,
            vec![(&b"build"[..], &b"release"[..]), (&b"arch"[..], &b"x86_64"[..])]
        );
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut meta = CoredumpMetadata::new();
        meta.set(b"a".to_vec(), b"1".to_vec()).unwrap();
        meta.set(b"b".to_vec(), b"2".to_vec()).unwrap();
        meta.set(b"a".to_vec(), b"3".to_vec()).unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.iter().next(), Some((&b"a"[..], &b"3"[..])));
        assert_eq!(meta.get(b"a"), Some(&b"3"[..]));
    }

    #[test]
    fn test_limits() {
        let mut meta = CoredumpMetadata::new();
        assert_eq!(
            meta.set(Vec::new(), b"x".to_vec()),
            Err(SyscallError::InvalidArgument)
        );
        assert_eq!(
            meta.set(vec![b'k'; MAX_COREDUMP_FIELD + 1], b"v".to_vec()),
            Err(SyscallError::ResourceExceeded)
        );
        assert!(meta.set(b"k".to_vec(), vec![b'v'; MAX_COREDUMP_FIELD]).is_ok());

        for i in 1..MAX_COREDUMP_ENTRIES {
            meta.set(vec![b'a', i as u8], Vec::new()).unwrap();
        }
        assert_eq!(
            meta.set(b"one-too-many".to_vec(), Vec::new()),
            Err(SyscallError::ResourceExceeded)
        );
        // Existing keys can still be updated when full.
        assert!(meta.set(b"k".to_vec(), b"new".to_vec()).is_ok());
        assert!(!meta.is_empty());
    }
}
