//! Heap creation parameters

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::lock::{HeapFeatures, LockMode};

/// Configuration passed to [`BinHeap::create`](crate::BinHeap::create)
///
/// The default is an exclusive-mutex heap with no slots preallocated.
///
/// ```rust
/// use indexed_binheap::{HeapConfig, HeapFeatures, LockMode};
///
/// let config = HeapConfig::default()
///     .with_features(HeapFeatures::RWLOCK)
///     .with_capacity(4096);
/// assert_eq!(config.lock_mode(), LockMode::RwLock);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeapConfig {
    /// Feature bits selecting the lock mode
    pub features: HeapFeatures,
    /// Initial capacity hint in nodes; rounded up to whole blocks
    pub capacity: u32,
}

impl HeapConfig {
    /// Replaces the feature bits
    pub fn with_features(mut self, features: HeapFeatures) -> Self {
        self.features = features;
        self
    }

    /// Sets the initial capacity hint
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Shorthand for a heap without an internal lock
    pub fn unlocked() -> Self {
        Self::default().with_features(HeapFeatures::NO_LOCK)
    }

    /// Shorthand for a read-mostly heap behind a reader-writer lock
    pub fn read_mostly() -> Self {
        Self::default().with_features(HeapFeatures::RWLOCK)
    }

    /// The lock mode these features resolve to
    pub fn lock_mode(&self) -> LockMode {
        LockMode::from_features(self.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HeapConfig::default();
        assert_eq!(config.capacity, 0);
        assert_eq!(config.lock_mode(), LockMode::Mutex);
    }

    #[test]
    fn test_shorthands() {
        assert_eq!(HeapConfig::unlocked().lock_mode(), LockMode::Unlocked);
        assert_eq!(HeapConfig::read_mostly().lock_mode(), LockMode::RwLock);
        assert_eq!(HeapConfig::read_mostly().with_capacity(9).capacity, 9);
    }
}
