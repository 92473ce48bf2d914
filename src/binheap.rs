//! Binary min-heap over caller-owned nodes
//!
//! [`BinHeap`] orders shared nodes (`Arc<N>`) by a caller-supplied predicate.
//! Each node embeds a [`NodeHandle`](crate::NodeHandle) in which the heap
//! keeps the node's current slot, so arbitrary members can be removed or
//! re-sorted in O(log n) without a search.
//!
//! Slots live in an [`IndexedStorage`], which grows one 512-slot block at a
//! time and never moves a slot once allocated. Every public operation runs
//! under the heap's [`LockMode`], chosen at creation.
//!
//! # Time Complexity
//!
//! | Operation     | Complexity |
//! |---------------|------------|
//! | `insert`      | O(log n)   |
//! | `remove`      | O(log n)   |
//! | `remove_root` | O(log n)   |
//! | `relocate`    | O(log n)   |
//! | `find`/`root` | O(1)       |
//!
//! # Example
//!
//! ```rust
//! use indexed_binheap::{BinHeap, HeapConfig, Node, OrdOps};
//!
//! let heap = BinHeap::new(HeapConfig::default(), OrdOps).unwrap();
//! let late = Node::shared(30);
//! heap.insert(Node::shared(10)).unwrap();
//! heap.insert(late.clone()).unwrap();
//! heap.insert(Node::shared(20)).unwrap();
//!
//! heap.remove(&late).unwrap();
//! assert_eq!(*heap.remove_root().unwrap().value(), 10);
//! assert_eq!(*heap.remove_root().unwrap().value(), 20);
//! assert!(heap.is_empty());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::config::HeapConfig;
use crate::lock::{HeapFeatures, HeapLock, LockMode};
use crate::storage::IndexedStorage;
use crate::traits::{BinHeapOps, HeapError, HeapNode};

/// State guarded by the heap lock
struct Core<N> {
    slots: IndexedStorage<Arc<N>>,
    /// Number of slots holding a node; always `<= slots.capacity()`
    count: u32,
}

impl<N: HeapNode> Core<N> {
    fn find(&self, idx: u32) -> Option<&Arc<N>> {
        if idx >= self.count {
            return None;
        }
        self.slots.get(idx)
    }

    /// Index of `node` if it is stored in this heap
    fn position(&self, node: &Arc<N>) -> Option<u32> {
        let idx = node.heap_handle().raw();
        match self.find(idx) {
            Some(stored) if Arc::ptr_eq(stored, node) => Some(idx),
            _ => None,
        }
    }

    fn swap(&mut self, a: u32, b: u32) {
        self.slots.swap(a, b);
        if let Some(node) = self.slots.get(a) {
            node.heap_handle().set(a);
        }
        if let Some(node) = self.slots.get(b) {
            node.heap_handle().set(b);
        }
    }

    /// True if the node at `a` must sort before the node at `b`
    fn precedes<O: BinHeapOps<N>>(&self, ops: &O, a: u32, b: u32) -> bool {
        match (self.slots.get(a), self.slots.get(b)) {
            (Some(a), Some(b)) => ops.compare(a, b),
            _ => false,
        }
    }

    /// Moves the node at `idx` toward the root; returns true if it moved
    fn bubble<O: BinHeapOps<N>>(&mut self, ops: &O, mut idx: u32) -> bool {
        let mut moved = false;
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.precedes(ops, idx, parent) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
            moved = true;
        }
        moved
    }

    /// Moves the node at `idx` toward the leaves; returns true if it moved
    fn sink<O: BinHeapOps<N>>(&mut self, ops: &O, mut idx: u32) -> bool {
        let mut moved = false;
        loop {
            let left = 2 * idx + 1;
            if left >= self.count {
                break;
            }

            let mut best = idx;
            if self.precedes(ops, left, best) {
                best = left;
            }
            let right = left + 1;
            if right < self.count && self.precedes(ops, right, best) {
                best = right;
            }

            if best == idx {
                break;
            }
            self.swap(idx, best);
            idx = best;
            moved = true;
        }
        moved
    }

    fn insert<O: BinHeapOps<N>>(&mut self, ops: &O, node: Arc<N>) -> Result<(), HeapError> {
        let idx = self.count;
        // Claimed before the hook runs so no other heap can link it meanwhile.
        if !node.heap_handle().try_claim(idx) {
            return Err(HeapError::AlreadyLinked);
        }

        let stored = self
            .slots
            .ensure_capacity(idx)
            .and_then(|()| ops.on_insert(&node).map_err(HeapError::Rejected))
            .and_then(|()| self.slots.set(idx, Arc::clone(&node)).map(drop));
        if let Err(err) = stored {
            node.heap_handle().detach();
            return Err(err);
        }
        self.count += 1;
        self.bubble(ops, idx);
        tracing::trace!(slot = idx, count = self.count, "inserted heap node");
        Ok(())
    }

    /// Removes the node at `idx` (which must be `< count`)
    fn remove_at<O: BinHeapOps<N>>(&mut self, ops: &O, idx: u32) -> Option<Arc<N>> {
        let last = self.count.checked_sub(1)?;
        if idx > last {
            return None;
        }
        self.count = last;

        let removed = if idx == last {
            self.slots.take(last)
        } else {
            self.swap(idx, last);
            let removed = self.slots.take(last);
            if !self.sink(ops, idx) {
                self.bubble(ops, idx);
            }
            removed
        };

        if let Some(node) = &removed {
            node.heap_handle().detach();
            tracing::trace!(slot = idx, count = self.count, "removed heap node");
            if let Err(err) = ops.on_remove(node) {
                tracing::warn!(error = %err, "exit hook failed; node was removed regardless");
            }
        }
        removed
    }

    fn relocate<O: BinHeapOps<N>>(&mut self, ops: &O, idx: u32) {
        if !self.bubble(ops, idx) {
            self.sink(ops, idx);
        }
    }

    /// Resets the handles of any remaining nodes and frees all blocks
    fn release(&mut self) -> u32 {
        let abandoned = self.count;
        for idx in 0..self.count {
            if let Some(node) = self.slots.get(idx) {
                node.heap_handle().detach();
            }
        }
        self.count = 0;
        self.slots.release();
        abandoned
    }
}

/// A resizable binary min-heap of shared, handle-carrying nodes
///
/// - `N`: the node type, carrying an embedded [`NodeHandle`](crate::NodeHandle)
/// - `O`: the ordering/hook table; pass `&ops` to borrow one that outlives
///   the heap
/// - `D`: opaque private data handed over at creation
///
/// The heap holds a reference count on each member but never owns caller
/// state beyond that. Nodes still present when the heap is dropped are
/// detached without running the exit hook; call [`drain`](Self::drain) first
/// if the hook must see them.
pub struct BinHeap<N: HeapNode, O, D = ()> {
    lock: HeapLock<Core<N>>,
    features: HeapFeatures,
    ops: O,
    private: D,
}

impl<N: HeapNode, O: BinHeapOps<N>> BinHeap<N, O> {
    /// Creates a heap without private data
    pub fn new(config: HeapConfig, ops: O) -> Result<Self, HeapError> {
        Self::create(config, (), ops)
    }
}

impl<N: HeapNode, O: BinHeapOps<N>, D> BinHeap<N, O, D> {
    /// Creates a heap with `config.capacity` slots preallocated
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::Alloc`] or [`HeapError::CapacityExceeded`] if the
    /// initial blocks cannot be provided.
    pub fn create(config: HeapConfig, private: D, ops: O) -> Result<Self, HeapError> {
        let slots = IndexedStorage::with_capacity(config.capacity)?;
        let mode = config.lock_mode();
        tracing::debug!(?mode, capacity = slots.capacity(), "created binary heap");

        Ok(Self {
            lock: HeapLock::new(mode, Core { slots, count: 0 }),
            features: config.features,
            ops,
            private,
        })
    }

    /// Creates a heap inside caller-owned storage
    ///
    /// On error `target` is left untouched.
    pub fn create_inplace<'a>(
        target: &'a mut Option<Self>,
        config: HeapConfig,
        private: D,
        ops: O,
    ) -> Result<&'a mut Self, HeapError> {
        let heap = Self::create(config, private, ops)?;
        Ok(target.insert(heap))
    }

    /// Sort-inserts `node`
    ///
    /// # Errors
    ///
    /// - [`HeapError::AlreadyLinked`] if the node's handle records a slot
    /// - [`HeapError::Alloc`] / [`HeapError::CapacityExceeded`] if a new block
    ///   is needed and cannot be provided
    /// - [`HeapError::Rejected`] if the enter hook refuses the node
    ///
    /// On any error the heap's contents are unchanged. Inserting one node
    /// into two heaps at once links it into exactly one of them.
    pub fn insert(&self, node: Arc<N>) -> Result<(), HeapError> {
        let ops = &self.ops;
        self.lock.write(|core| core.insert(ops, node))
    }

    /// Removes `node` from anywhere in the heap
    ///
    /// The exit hook runs after the removal; its failure is logged but the
    /// node stays removed.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::NotMember`] if `node` is not stored in this heap.
    pub fn remove(&self, node: &Arc<N>) -> Result<(), HeapError> {
        let ops = &self.ops;
        self.lock.write(|core| {
            let idx = core.position(node).ok_or(HeapError::NotMember)?;
            core.remove_at(ops, idx);
            Ok(())
        })
    }

    /// Removes and returns the root (the minimum), or `None` when empty
    pub fn remove_root(&self) -> Option<Arc<N>> {
        let ops = &self.ops;
        self.lock.write(|core| core.remove_at(ops, 0))
    }

    /// Restores heap order after the caller changed `node`'s priority
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::NotMember`] if `node` is not stored in this heap.
    pub fn relocate(&self, node: &Arc<N>) -> Result<(), HeapError> {
        let ops = &self.ops;
        self.lock.write(|core| {
            let idx = core.position(node).ok_or(HeapError::NotMember)?;
            core.relocate(ops, idx);
            Ok(())
        })
    }

    /// Removes every node in priority order, running the exit hook for each
    pub fn drain(&self) -> Vec<Arc<N>> {
        let ops = &self.ops;
        self.lock.write(|core| {
            let mut drained = Vec::with_capacity(core.count as usize);
            while let Some(node) = core.remove_at(ops, 0) {
                drained.push(node);
            }
            drained
        })
    }
}

impl<N: HeapNode, O, D> BinHeap<N, O, D> {
    /// Returns the node at slot `idx`, or `None` if `idx >= len()`
    pub fn find(&self, idx: u32) -> Option<Arc<N>> {
        self.lock.read(|core| core.find(idx).cloned())
    }

    /// Returns the root without removing it
    pub fn root(&self) -> Option<Arc<N>> {
        self.find(0)
    }

    /// Number of nodes in the heap
    pub fn len(&self) -> usize {
        self.lock.read(|core| core.count as usize)
    }

    /// True if the heap holds no nodes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots currently backed by storage blocks (the high-water mark)
    pub fn capacity(&self) -> u32 {
        self.lock.read(|core| core.slots.capacity())
    }

    /// Feature bits the heap was created with
    pub fn features(&self) -> HeapFeatures {
        self.features
    }

    /// The lock mode fixed at creation
    pub fn lock_mode(&self) -> LockMode {
        self.lock.mode()
    }

    /// The ordering/hook table
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// The private data supplied at creation
    pub fn private_data(&self) -> &D {
        &self.private
    }

    /// Releases the heap and its storage
    pub fn destroy(self) {
        drop(self);
    }

    /// Releases a heap created with [`create_inplace`](Self::create_inplace),
    /// leaving `target` empty
    pub fn destroy_inplace(target: &mut Option<Self>) {
        if let Some(heap) = target.take() {
            heap.destroy();
        }
    }
}

impl<N: HeapNode, O, D> Drop for BinHeap<N, O, D> {
    fn drop(&mut self) {
        let abandoned = self.lock.get_mut().release();
        if abandoned > 0 {
            tracing::warn!(abandoned, "binary heap destroyed while still holding nodes");
        }
        tracing::debug!("destroyed binary heap");
    }
}

impl<N: HeapNode, O, D> fmt::Debug for BinHeap<N, O, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, capacity) = self
            .lock
            .read(|core| (core.count, core.slots.capacity()));
        f.debug_struct("BinHeap")
            .field("mode", &self.lock.mode())
            .field("len", &len)
            .field("capacity", &capacity)
            .finish_non_exhaustive()
    }
}

/// Size of a possibly absent heap
///
/// # Errors
///
/// Returns [`HeapError::InvalidHeap`] for `None`.
pub fn heap_size<N: HeapNode, O, D>(heap: Option<&BinHeap<N, O, D>>) -> Result<usize, HeapError> {
    match heap {
        Some(heap) => Ok(heap.len()),
        None => {
            tracing::error!("invalid absent heap");
            Err(HeapError::InvalidHeap)
        }
    }
}

/// Emptiness of a possibly absent heap; an absent heap counts as empty
pub fn heap_is_empty<N: HeapNode, O, D>(heap: Option<&BinHeap<N, O, D>>) -> bool {
    heap.map_or(true, BinHeap::is_empty)
}
