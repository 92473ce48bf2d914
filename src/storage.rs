//! Radix-indexed block storage for heap slots
//!
//! [`IndexedStorage`] maps a dense logical index to a slot that never moves
//! once allocated. Slots live in fixed blocks of [`BLOCK_SIZE`] entries, and
//! blocks are reached through up to three tiers of indirection:
//!
//! | Tier | Indices                             | Path                     |
//! |------|-------------------------------------|--------------------------|
//! | 1    | `[0, 512)`                          | leaf                     |
//! | 2    | next `512^2`                        | directory → leaf         |
//! | 3    | next `512^3`                        | directory → directory → leaf |
//!
//! Within a tier, the offset from the tier base is split into 9-bit digits
//! (`leaf = off & 511`, `mid = (off >> 9) & 511`, `top = off >> 18`).
//!
//! # Growth
//!
//! Growing adds exactly one leaf block, plus whatever directories are needed
//! to reach it, and raises the high-water mark by [`BLOCK_SIZE`]. Existing
//! blocks are never reallocated or copied, so a slot's address is stable for
//! the lifetime of the storage. Allocation goes through `try_reserve_exact`,
//! which turns allocator failure into [`HeapError::Alloc`].

use std::fmt;

use crate::traits::HeapError;

/// log2 of the number of entries per block
pub const BLOCK_SHIFT: u32 = 9;
/// Number of entries per block (leaf or directory)
pub const BLOCK_SIZE: usize = 1 << BLOCK_SHIFT;

const BLOCK_MASK: u64 = BLOCK_SIZE as u64 - 1;
const TIER1_SLOTS: u64 = BLOCK_SIZE as u64;
const TIER2_SLOTS: u64 = TIER1_SLOTS * TIER1_SLOTS;
const TIER3_SLOTS: u64 = TIER2_SLOTS * TIER1_SLOTS;

/// Largest number of slots the three tiers can provide
pub const MAX_CAPACITY: u64 = TIER1_SLOTS + TIER2_SLOTS + TIER3_SLOTS;

/// A fixed-size block: either a leaf of slots or a directory of blocks
type Dir<C> = Box<[Option<C>]>;

/// Position of a logical index within the tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Direct(usize),
    Double(usize, usize),
    Triple(usize, usize, usize),
}

impl Place {
    fn of(idx: u32) -> Self {
        let idx = u64::from(idx);
        if idx < TIER1_SLOTS {
            return Place::Direct(idx as usize);
        }

        let off = idx - TIER1_SLOTS;
        if off < TIER2_SLOTS {
            return Place::Double((off >> BLOCK_SHIFT) as usize, (off & BLOCK_MASK) as usize);
        }

        let off = off - TIER2_SLOTS;
        Place::Triple(
            (off >> (2 * BLOCK_SHIFT)) as usize,
            ((off >> BLOCK_SHIFT) & BLOCK_MASK) as usize,
            (off & BLOCK_MASK) as usize,
        )
    }
}

fn alloc_dir<C>() -> Result<Dir<C>, HeapError> {
    let mut entries = Vec::new();
    entries.try_reserve_exact(BLOCK_SIZE)?;
    entries.resize_with(BLOCK_SIZE, || None);
    Ok(entries.into_boxed_slice())
}

fn get_or_alloc<C>(slot: &mut Option<Dir<C>>) -> Result<&mut Dir<C>, HeapError> {
    let dir = match slot.take() {
        Some(dir) => dir,
        None => alloc_dir()?,
    };
    Ok(slot.insert(dir))
}

/// Pointer-stable sparse array addressed by a three-tier radix-512 index
pub struct IndexedStorage<T> {
    direct: Option<Dir<T>>,
    double: Option<Dir<Dir<T>>>,
    triple: Option<Dir<Dir<Dir<T>>>>,
    /// High-water mark: number of slots currently backed by a block
    hwm: u32,
}

impl<T> IndexedStorage<T> {
    /// Creates storage with no blocks allocated
    pub const fn new() -> Self {
        Self {
            direct: None,
            double: None,
            triple: None,
            hwm: 0,
        }
    }

    /// Creates storage backing at least `capacity` slots
    pub fn with_capacity(capacity: u32) -> Result<Self, HeapError> {
        let mut storage = Self::new();
        if capacity > 0 {
            storage.ensure_capacity(capacity - 1)?;
        }
        Ok(storage)
    }

    /// Number of slots currently backed by a block (always a multiple of
    /// [`BLOCK_SIZE`])
    pub fn capacity(&self) -> u32 {
        self.hwm
    }

    /// Grows until slot `idx` is backed by a block
    pub fn ensure_capacity(&mut self, idx: u32) -> Result<(), HeapError> {
        if u64::from(idx) >= MAX_CAPACITY {
            return Err(HeapError::CapacityExceeded {
                requested: u64::from(idx),
            });
        }
        while idx >= self.hwm {
            self.grow()?;
        }
        Ok(())
    }

    /// Adds the block that starts at the current high-water mark
    fn grow(&mut self) -> Result<(), HeapError> {
        let base = self.hwm;
        if u64::from(base) >= MAX_CAPACITY {
            return Err(HeapError::CapacityExceeded {
                requested: u64::from(base),
            });
        }

        match Place::of(base) {
            Place::Direct(_) => {
                self.direct = Some(alloc_dir()?);
            }
            Place::Double(mid, _) => {
                let dir = get_or_alloc(&mut self.double)?;
                dir[mid] = Some(alloc_dir()?);
            }
            Place::Triple(top, mid, _) => {
                let top_dir = get_or_alloc(&mut self.triple)?;
                let mid_dir = get_or_alloc(&mut top_dir[top])?;
                mid_dir[mid] = Some(alloc_dir()?);
            }
        }

        self.hwm += BLOCK_SIZE as u32;
        tracing::debug!(capacity = self.hwm, "grew heap index storage");
        Ok(())
    }

    fn slot(&self, idx: u32) -> Option<&Option<T>> {
        if idx >= self.hwm {
            return None;
        }
        match Place::of(idx) {
            Place::Direct(leaf) => self.direct.as_ref()?.get(leaf),
            Place::Double(mid, leaf) => self.double.as_ref()?.get(mid)?.as_ref()?.get(leaf),
            Place::Triple(top, mid, leaf) => self
                .triple
                .as_ref()?
                .get(top)?
                .as_ref()?
                .get(mid)?
                .as_ref()?
                .get(leaf),
        }
    }

    fn slot_mut(&mut self, idx: u32) -> Option<&mut Option<T>> {
        if idx >= self.hwm {
            return None;
        }
        match Place::of(idx) {
            Place::Direct(leaf) => self.direct.as_mut()?.get_mut(leaf),
            Place::Double(mid, leaf) => self.double.as_mut()?.get_mut(mid)?.as_mut()?.get_mut(leaf),
            Place::Triple(top, mid, leaf) => self
                .triple
                .as_mut()?
                .get_mut(top)?
                .as_mut()?
                .get_mut(mid)?
                .as_mut()?
                .get_mut(leaf),
        }
    }

    /// Returns the value in slot `idx`, if the slot exists and is occupied
    pub fn get(&self, idx: u32) -> Option<&T> {
        self.slot(idx)?.as_ref()
    }

    /// Stores `value` in slot `idx`, returning the previous occupant
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::CapacityExceeded`] if `idx` is at or past the
    /// high-water mark; call [`ensure_capacity`](Self::ensure_capacity) first.
    pub fn set(&mut self, idx: u32, value: T) -> Result<Option<T>, HeapError> {
        match self.slot_mut(idx) {
            Some(slot) => Ok(slot.replace(value)),
            None => Err(HeapError::CapacityExceeded {
                requested: u64::from(idx),
            }),
        }
    }

    /// Empties slot `idx`, returning its occupant
    pub fn take(&mut self, idx: u32) -> Option<T> {
        self.slot_mut(idx)?.take()
    }

    /// Exchanges the contents of two slots
    pub fn swap(&mut self, a: u32, b: u32) {
        if a == b || a >= self.hwm || b >= self.hwm {
            return;
        }
        let first = self.take(a);
        let second = self.take(b);
        if let Some(slot) = self.slot_mut(a) {
            *slot = second;
        }
        if let Some(slot) = self.slot_mut(b) {
            *slot = first;
        }
    }

    /// Drops every block, returning the storage to zero capacity
    pub fn release(&mut self) {
        *self = Self::new();
    }
}

impl<T> Default for IndexedStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for IndexedStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedStorage")
            .field("capacity", &self.hwm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T2_BASE: u32 = BLOCK_SIZE as u32;
    const T3_BASE: u32 = T2_BASE + (BLOCK_SIZE * BLOCK_SIZE) as u32;

    #[test]
    fn test_place_decomposition() {
        assert_eq!(Place::of(0), Place::Direct(0));
        assert_eq!(Place::of(511), Place::Direct(511));
        assert_eq!(Place::of(512), Place::Double(0, 0));
        assert_eq!(Place::of(512 + 513), Place::Double(1, 1));
        assert_eq!(Place::of(T3_BASE - 1), Place::Double(511, 511));
        assert_eq!(Place::of(T3_BASE), Place::Triple(0, 0, 0));
        assert_eq!(
            Place::of(T3_BASE + (3 << 18) + (2 << 9) + 1),
            Place::Triple(3, 2, 1)
        );
        assert_eq!(
            Place::of((MAX_CAPACITY - 1) as u32),
            Place::Triple(511, 511, 511)
        );
    }

    #[test]
    fn test_empty_storage() {
        let storage: IndexedStorage<u32> = IndexedStorage::new();
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.get(0), None);
    }

    #[test]
    fn test_capacity_rounds_to_blocks() {
        let storage: IndexedStorage<u32> = IndexedStorage::with_capacity(1).unwrap();
        assert_eq!(storage.capacity(), 512);

        let storage: IndexedStorage<u32> = IndexedStorage::with_capacity(513).unwrap();
        assert_eq!(storage.capacity(), 1024);

        let storage: IndexedStorage<u32> = IndexedStorage::with_capacity(0).unwrap();
        assert_eq!(storage.capacity(), 0);
    }

    #[test]
    fn test_set_get_take_swap() {
        let mut storage = IndexedStorage::with_capacity(1024).unwrap();
        assert_eq!(storage.set(3, "a"), Ok(None));
        assert_eq!(storage.set(700, "b"), Ok(None));
        assert_eq!(storage.get(3), Some(&"a"));
        assert_eq!(storage.get(700), Some(&"b"));

        storage.swap(3, 700);
        assert_eq!(storage.get(3), Some(&"b"));
        assert_eq!(storage.get(700), Some(&"a"));

        assert_eq!(storage.set(3, "c"), Ok(Some("b")));
        assert_eq!(storage.take(700), Some("a"));
        assert_eq!(storage.get(700), None);
        assert_eq!(storage.take(5000), None);
    }

    #[test]
    fn test_set_past_capacity_is_an_error() {
        let mut storage = IndexedStorage::new();
        assert_eq!(
            storage.set(0, 1u8),
            Err(HeapError::CapacityExceeded { requested: 0 })
        );

        storage.ensure_capacity(0).unwrap();
        assert_eq!(storage.set(0, 1u8), Ok(None));
        assert_eq!(
            storage.set(BLOCK_SIZE as u32, 2u8),
            Err(HeapError::CapacityExceeded {
                requested: BLOCK_SIZE as u64
            })
        );
        assert_eq!(storage.get(BLOCK_SIZE as u32), None);
        assert_eq!(storage.capacity(), BLOCK_SIZE as u32);
    }

    #[test]
    fn test_growth_never_moves_slots() {
        let mut storage = IndexedStorage::with_capacity(1).unwrap();
        storage.set(0, 42u64).unwrap();
        storage.set(511, 7u64).unwrap();
        let first = storage.get(0).unwrap() as *const u64;
        let last = storage.get(511).unwrap() as *const u64;

        storage.ensure_capacity(10 * BLOCK_SIZE as u32).unwrap();

        assert!(std::ptr::eq(first, storage.get(0).unwrap()));
        assert!(std::ptr::eq(last, storage.get(511).unwrap()));
        assert_eq!(storage.get(0), Some(&42));
    }

    #[test]
    fn test_third_tier() {
        let mut storage = IndexedStorage::new();
        storage.ensure_capacity(T3_BASE).unwrap();
        assert_eq!(storage.capacity(), T3_BASE + BLOCK_SIZE as u32);

        storage.set(T3_BASE, 1u8).unwrap();
        storage.set(T3_BASE - 1, 2u8).unwrap();
        storage.set(0, 3u8).unwrap();
        assert_eq!(storage.get(T3_BASE), Some(&1));
        assert_eq!(storage.get(T3_BASE - 1), Some(&2));
        assert_eq!(storage.get(0), Some(&3));
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut storage: IndexedStorage<u8> = IndexedStorage::new();
        let err = storage.ensure_capacity(MAX_CAPACITY as u32).unwrap_err();
        assert_eq!(
            err,
            HeapError::CapacityExceeded {
                requested: MAX_CAPACITY
            }
        );
        assert_eq!(storage.capacity(), 0);
    }

    #[test]
    fn test_release() {
        let mut storage = IndexedStorage::with_capacity(2048).unwrap();
        storage.set(2000, 1i32).unwrap();
        storage.release();
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.get(2000), None);
    }
}
