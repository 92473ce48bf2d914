//! Node handles
//!
//! A [`NodeHandle`] is the only piece of heap state that lives inside caller
//! objects: the slot index the node currently occupies. The heap rewrites it
//! on every move, so a caller holding the node can always hand it back to
//! [`BinHeap::remove`](crate::BinHeap::remove) without searching.
//!
//! The index is stored in an atomic so that nodes can be shared across threads
//! by `Arc`. Linking a detached node is a compare-exchange, so two heaps racing
//! to insert the same node cannot both win; every later write happens under
//! the owning heap's lock, so relaxed ordering is enough there.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::traits::HeapNode;

/// Slot index embedded in a heap node
pub struct NodeHandle {
    idx: AtomicU32,
}

impl NodeHandle {
    /// Index value of a handle that is not linked into any heap
    pub const DETACHED: u32 = u32::MAX;

    /// Creates a detached handle
    pub const fn new() -> Self {
        Self {
            idx: AtomicU32::new(Self::DETACHED),
        }
    }

    /// Returns the slot this node occupies, or `None` when detached
    pub fn index(&self) -> Option<u32> {
        match self.idx.load(Ordering::Relaxed) {
            Self::DETACHED => None,
            idx => Some(idx),
        }
    }

    /// Returns true if the handle records a slot
    pub fn is_linked(&self) -> bool {
        self.index().is_some()
    }

    #[inline]
    pub(crate) fn raw(&self) -> u32 {
        self.idx.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set(&self, idx: u32) {
        self.idx.store(idx, Ordering::Relaxed);
    }

    /// Links a detached handle to `idx`; fails if any heap already holds it
    #[inline]
    pub(crate) fn try_claim(&self, idx: u32) -> bool {
        self.idx
            .compare_exchange(Self::DETACHED, idx, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    pub(crate) fn detach(&self) {
        self.set(Self::DETACHED);
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(idx) => f.debug_tuple("NodeHandle").field(&idx).finish(),
            None => f.write_str("NodeHandle(detached)"),
        }
    }
}

/// A ready-made heap node wrapping an arbitrary payload
///
/// Use this when the ordered objects should not carry a [`NodeHandle`] of
/// their own. Comparisons and ordering go through the payload:
/// `Node<T>` is `Ord` whenever `T` is, ignoring the handle.
///
/// ```rust
/// use indexed_binheap::{BinHeap, HeapConfig, Node, OrdOps};
///
/// let heap = BinHeap::new(HeapConfig::default(), OrdOps).unwrap();
/// let job = Node::shared("compact");
/// heap.insert(job.clone()).unwrap();
/// assert_eq!(job.handle().index(), Some(0));
/// ```
pub struct Node<T> {
    handle: NodeHandle,
    value: T,
}

impl<T> Node<T> {
    /// Creates a detached node
    pub fn new(value: T) -> Self {
        Self {
            handle: NodeHandle::new(),
            value,
        }
    }

    /// Creates a detached node already wrapped in an `Arc`
    pub fn shared(value: T) -> Arc<Self> {
        Arc::new(Self::new(value))
    }

    /// The payload
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The embedded handle
    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Unwraps the payload
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> HeapNode for Node<T> {
    fn heap_handle(&self) -> &NodeHandle {
        &self.handle
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T: PartialEq> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Node<T> {}

impl<T: PartialOrd> PartialOrd for Node<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Ord> Ord for Node<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}
