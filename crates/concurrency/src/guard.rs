//! Process-wide read/write guard
//!
//! One [`ConcurrencyGuard`] protects all dataset/index state: any number of
//! concurrent readers, or exactly one writer, never both. A write on one dataset
//! therefore blocks reads and writes on every other dataset; the trade is
//! simplicity over parallelism.
//!
//! Access is scoped: the closure passed to [`ConcurrencyGuard::with_read`] or
//! [`ConcurrencyGuard::with_write`] runs with the lock held, and the lock is
//! released on every exit path, including unwinding.
//!
//! Uses parking_lot::RwLock so a panic inside a critical section does not poison
//! the guard for every later caller.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Acquisition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    /// Shared acquisitions so far
    pub reads: u64,
    /// Exclusive acquisitions so far
    pub writes: u64,
}

/// Scoped read/write lock around `T`
#[derive(Debug, Default)]
pub struct ConcurrencyGuard<T> {
    state: RwLock<T>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl<T> ConcurrencyGuard<T> {
    /// Wrap `state`
    pub fn new(state: T) -> Self {
        ConcurrencyGuard {
            state: RwLock::new(state),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Run `f` holding the lock in shared mode
    ///
    /// Must not be nested inside another `with_read`/`with_write` on the same
    /// guard: a queued writer would deadlock the inner acquisition.
    pub fn with_read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.read();
        self.reads.fetch_add(1, Ordering::Relaxed);
        f(&state)
    }

    /// Run `f` holding the lock in exclusive mode
    pub fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = self.state.write();
        self.writes.fetch_add(1, Ordering::Relaxed);
        f(&mut state)
    }

    /// Acquisition counters
    pub fn stats(&self) -> GuardStats {
        GuardStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    /// Consume the guard and return the protected state
    pub fn into_inner(self) -> T {
        self.state.into_inner()
    }
}
