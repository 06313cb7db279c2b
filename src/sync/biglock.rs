//! Per-Process Big Lock
//!
//! Serializes every mutation of a process's own state.
//!
//! # Design
//! - `spin::Mutex` provides the mutual exclusion
//! - The owning thread is recorded next to the mutex so handler entry
//!   points can assert the expected lock state
//! - Discipline violations are kernel bugs: they trip `debug_assert!`
//!   and compile to nothing in release builds

use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

use spin::{Mutex, MutexGuard};

/// Identifier of a kernel thread, handed out by the scheduler.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Raw value reserved to mean "nobody holds the lock".
    const NONE: u32 = u32::MAX;

    /// Create a thread id.
    ///
    /// # Panics
    /// Panics in debug mode if `id` is the reserved value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        debug_assert!(id != Self::NONE);
        Self(id)
    }

    /// Get the raw id.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

/// Exclusive lock over a process's mutable state.
pub struct BigLock<T> {
    inner: Mutex<T>,
    owner: AtomicU32,
}

impl<T> BigLock<T> {
    /// Create a new, unlocked big lock.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            owner: AtomicU32::new(ThreadId::NONE),
        }
    }

    /// Acquire the lock on behalf of `tid`, spinning until it is free.
    ///
    /// # Panics
    /// Panics in debug mode if `tid` already holds the lock; in release
    /// builds that would deadlock instead.
    pub fn lock(&self, tid: ThreadId) -> BigLockGuard<'_, T> {
        debug_assert!(
            !self.is_held_by(tid),
            "big lock re-entered by {:?}",
            tid
        );
        let guard = self.inner.lock();
        self.owner.store(tid.0, Ordering::Release);
        BigLockGuard {
            lock: self,
            guard,
            tid,
        }
    }

    /// Try to acquire the lock without spinning.
    pub fn try_lock(&self, tid: ThreadId) -> Option<BigLockGuard<'_, T>> {
        let guard = self.inner.try_lock()?;
        self.owner.store(tid.0, Ordering::Release);
        Some(BigLockGuard {
            lock: self,
            guard,
            tid,
        })
    }

    /// Whether `tid` currently holds this lock.
    #[inline]
    pub fn is_held_by(&self, tid: ThreadId) -> bool {
        self.owner.load(Ordering::Acquire) == tid.0
    }

    /// Whether anyone holds this lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<T> fmt::Debug for BigLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner.load(Ordering::Relaxed) {
            ThreadId::NONE => write!(f, "BigLock(unlocked)"),
            owner => write!(f, "BigLock(held by tid:{})", owner),
        }
    }
}

/// Proof that the big lock is held by a specific thread.
///
/// Dropping the guard releases the lock.
pub struct BigLockGuard<'a, T> {
    lock: &'a BigLock<T>,
    guard: MutexGuard<'a, T>,
    tid: ThreadId,
}

impl<'a, T> BigLockGuard<'a, T> {
    /// Thread that owns this guard.
    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.tid
    }

    /// Whether this guard was taken on `lock`.
    #[inline]
    pub fn guards(&self, lock: &BigLock<T>) -> bool {
        core::ptr::eq(self.lock, lock)
    }
}

impl<T> Deref for BigLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for BigLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for BigLockGuard<'_, T> {
    fn drop(&mut self) {
        debug_assert!(
            self.lock.is_held_by(self.tid),
            "big lock released by {:?} but not owned by it",
            self.tid
        );
        // Clear the owner before the mutex guard field drops and unlocks.
        self.lock.owner.store(ThreadId::NONE, Ordering::Release);
    }
}

/// Assert that `tid` holds `lock` at handler entry.
///
/// Lock-required handlers call this first. No-op in release builds.
#[inline]
#[track_caller]
pub fn verify_big_lock_acquired<T>(lock: &BigLock<T>, tid: ThreadId) {
    debug_assert!(
        lock.is_held_by(tid),
        "lock-required handler entered without the big lock ({:?})",
        tid
    );
}

/// Assert that `tid` does not hold `lock` at handler entry.
///
/// Lock-free handlers call this first. No-op in release builds.
#[inline]
#[track_caller]
pub fn verify_no_big_lock<T>(lock: &BigLock<T>, tid: ThreadId) {
    debug_assert!(
        !lock.is_held_by(tid),
        "lock-free handler entered holding the big lock ({:?})",
        tid
    );
}
