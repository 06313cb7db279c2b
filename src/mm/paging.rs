//! User Page Permissions
//!
//! Architecture-neutral page flags as reported by the VM subsystem's
//! page-table lookups.
//!
//! # Security Properties
//! - The memory boundary only trusts pages carrying `USER`
//! - Write access requires an explicit `WRITE` bit

use bitflags::bitflags;

bitflags! {
    /// Permissions of a mapped user page.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct PageFlags: u32 {
        /// Entry is present.
        const VALID = 1 << 0;
        /// Accessible from EL0.
        const USER = 1 << 1;
        /// Readable.
        const READ = 1 << 2;
        /// Writable.
        const WRITE = 1 << 3;
        /// Executable.
        const EXEC = 1 << 4;

        /// User data: readable/writable, not executable.
        const USER_DATA = Self::VALID.bits() | Self::USER.bits() | Self::READ.bits() | Self::WRITE.bits();
        /// User read-only data.
        const USER_RODATA = Self::VALID.bits() | Self::USER.bits() | Self::READ.bits();
        /// User code: readable, executable.
        const USER_CODE = Self::VALID.bits() | Self::USER.bits() | Self::READ.bits() | Self::EXEC.bits();
    }
}

/// Kind of access the kernel performs on a user page.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    Read,
    Write,
}

impl PageFlags {
    /// Flags a page must carry for the kernel to access it on the user's behalf.
    #[inline]
    pub const fn required_for(access: Access) -> Self {
        match access {
            Access::Read => Self::USER_RODATA,
            Access::Write => Self::from_bits_retain(Self::USER_RODATA.bits() | Self::WRITE.bits()),
        }
    }

    /// Whether these flags permit `access` from user context.
    #[inline]
    pub const fn permits(self, access: Access) -> bool {
        self.contains(Self::required_for(access))
    }
}

/// Error type for page mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// The virtual address is already mapped.
    AlreadyMapped,
    /// The virtual address is not mapped.
    NotMapped,
    /// The address is not properly aligned.
    MisalignedAddress,
    /// Range lies outside the user window or flags lack `USER`.
    InvalidPermissions,
}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "virtual address already mapped"),
            Self::NotMapped => write!(f, "virtual address not mapped"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
            Self::InvalidPermissions => write!(f, "invalid permission combination"),
        }
    }
}
