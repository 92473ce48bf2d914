//! Per-heap locking policy
//!
//! A heap picks one of three modes when it is created and keeps it for life:
//!
//! | Mode                   | Mutations             | Queries (`find`, `len`) |
//! |------------------------|-----------------------|-------------------------|
//! | [`LockMode::Unlocked`] | claimed, never blocks | claimed, never blocks   |
//! | [`LockMode::Mutex`]    | exclusive lock        | exclusive lock          |
//! | [`LockMode::RwLock`]   | writer lock           | reader lock             |
//!
//! `Unlocked` is for heaps that are serialised externally or used from a
//! single thread. Access is still claimed with a non-blocking `try_lock` so
//! the heap stays sound; if the claim fails, two threads reached the heap at
//! once and the call panics, the same way a `RefCell` reports a double borrow.

use parking_lot::{Mutex, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Feature bits chosen when a heap is created
    ///
    /// With neither bit set the heap is guarded by an exclusive mutex.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct HeapFeatures: u32 {
        /// No internal lock; the caller serialises access
        const NO_LOCK = 1 << 0;
        /// Read-mostly heap guarded by a reader-writer lock
        const RWLOCK = 1 << 1;
    }
}

impl Default for HeapFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Concurrency mode of a heap, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// No internal lock
    Unlocked,
    /// Every operation takes the same exclusive lock
    Mutex,
    /// Mutations take the writer lock, queries the reader lock
    RwLock,
}

impl LockMode {
    /// Resolves feature bits to a mode; `NO_LOCK` wins over `RWLOCK`
    pub fn from_features(features: HeapFeatures) -> Self {
        if features.contains(HeapFeatures::NO_LOCK) {
            LockMode::Unlocked
        } else if features.contains(HeapFeatures::RWLOCK) {
            LockMode::RwLock
        } else {
            LockMode::Mutex
        }
    }
}

/// The lock primitive matching a [`LockMode`], wrapping the guarded state
pub(crate) enum HeapLock<S> {
    Unlocked(Mutex<S>),
    Exclusive(Mutex<S>),
    Shared(RwLock<S>),
}

impl<S> HeapLock<S> {
    pub(crate) fn new(mode: LockMode, state: S) -> Self {
        match mode {
            LockMode::Unlocked => HeapLock::Unlocked(Mutex::new(state)),
            LockMode::Mutex => HeapLock::Exclusive(Mutex::new(state)),
            LockMode::RwLock => HeapLock::Shared(RwLock::new(state)),
        }
    }

    pub(crate) fn mode(&self) -> LockMode {
        match self {
            HeapLock::Unlocked(_) => LockMode::Unlocked,
            HeapLock::Exclusive(_) => LockMode::Mutex,
            HeapLock::Shared(_) => LockMode::RwLock,
        }
    }

    /// Runs `f` with shared access to the state
    pub(crate) fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        match self {
            HeapLock::Unlocked(cell) => f(&*claim(cell)),
            HeapLock::Exclusive(mutex) => f(&*mutex.lock()),
            HeapLock::Shared(rwlock) => f(&*rwlock.read()),
        }
    }

    /// Runs `f` with exclusive access to the state
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        match self {
            HeapLock::Unlocked(cell) => f(&mut *claim(cell)),
            HeapLock::Exclusive(mutex) => f(&mut *mutex.lock()),
            HeapLock::Shared(rwlock) => f(&mut *rwlock.write()),
        }
    }

    /// Direct access through `&mut self`; no locking needed
    pub(crate) fn get_mut(&mut self) -> &mut S {
        match self {
            HeapLock::Unlocked(cell) | HeapLock::Exclusive(cell) => cell.get_mut(),
            HeapLock::Shared(rwlock) => rwlock.get_mut(),
        }
    }
}

fn claim<S>(cell: &Mutex<S>) -> parking_lot::MutexGuard<'_, S> {
    match cell.try_lock() {
        Some(guard) => guard,
        None => panic!("concurrent access to a NO_LOCK heap; callers must serialise it"),
    }
}
