//! System Call Error Convention
//!
//! Every fallible operation behind the gate returns a `SyscallResult`.
//! Errors carry their POSIX errno as the (negative) discriminant so the
//! dispatcher can place them directly in the return register.
//!
//! # Security Considerations
//! - User input can only ever produce one of these values, never a panic
//! - A handler returning `Err` must not have mutated any process state

use core::fmt;

/// System call error codes
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// A required promise has been dropped (EPERM)
    PermissionDenied = -1,
    /// No process with the requested pid (ESRCH)
    NoSuchProcess = -3,
    /// Bad address: unmapped, wrong permissions, null or overflowing (EFAULT)
    MemoryFault = -14,
    /// Well-formed but rejected input (EINVAL)
    InvalidArgument = -22,
    /// Input exceeds a hard size ceiling (ENAMETOOLONG)
    ResourceExceeded = -36,
    /// Invalid system call number (ENOSYS)
    NoSys = -38,
}

impl SyscallError {
    /// Positive errno value as seen by user space.
    #[inline]
    pub const fn errno(self) -> i64 {
        -(self as i64)
    }

    /// Symbolic errno name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PermissionDenied => "EPERM",
            Self::NoSuchProcess => "ESRCH",
            Self::MemoryFault => "EFAULT",
            Self::InvalidArgument => "EINVAL",
            Self::ResourceExceeded => "ENAMETOOLONG",
            Self::NoSys => "ENOSYS",
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::PermissionDenied => "operation not permitted by pledge",
            Self::NoSuchProcess => "no such process",
            Self::MemoryFault => "bad user address",
            Self::InvalidArgument => "invalid argument",
            Self::ResourceExceeded => "input exceeds size limit",
            Self::NoSys => "unknown system call",
        };
        write!(f, "{} ({})", what, self.name())
    }
}

/// Result type returned by every syscall handler.
pub type SyscallResult<T = usize> = Result<T, SyscallError>;

/// Encode a handler result into the value placed in x0.
///
/// Success values are returned as-is; errors become negative errno.
#[inline]
pub fn encode(result: SyscallResult) -> i64 {
    match result {
        Ok(value) => value as i64,
        Err(e) => e as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(SyscallError::PermissionDenied.errno(), 1);
        assert_eq!(SyscallError::MemoryFault.errno(), 14);
        assert_eq!(SyscallError::InvalidArgument.errno(), 22);
        assert_eq!(SyscallError::ResourceExceeded.errno(), 36);
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(Ok(42)), 42);
        assert_eq!(encode(Err(SyscallError::MemoryFault)), -14);
        assert_eq!(encode(Err(SyscallError::NoSys)), -38);
    }

    #[test]
    fn test_display_names_errno() {
        let text = alloc::format!("{}", SyscallError::PermissionDenied);
        assert!(text.contains("EPERM"));
    }
}
