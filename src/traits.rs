//! Common traits and errors for the binary heap
//!
//! This module provides the two seams between [`BinHeap`](crate::BinHeap) and
//! the objects it orders:
//!
//! - [`HeapNode`]: implemented by caller objects that embed a [`NodeHandle`]
//! - [`BinHeapOps`]: the ordering predicate plus optional enter/exit hooks
//!
//! The heap never inspects a node beyond these two traits, so any caller type
//! can be ordered by any criterion it likes.

use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::node::NodeHandle;

/// Error type for heap operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// A query was made against an absent heap
    #[error("invalid (absent) heap")]
    InvalidHeap,
    /// An index block could not be allocated
    #[error("failed to allocate heap index block: {0}")]
    Alloc(#[from] TryReserveError),
    /// The requested slot lies beyond the last indirection tier
    #[error("heap capacity exceeded: slot {requested} is out of range")]
    CapacityExceeded {
        /// Slot index that could not be provided
        requested: u64,
    },
    /// The enter hook refused the node; the heap was left unchanged
    #[error("insert rejected by enter hook: {0}")]
    Rejected(HookError),
    /// The node's handle already records a slot in some heap
    #[error("node is already linked into a heap")]
    AlreadyLinked,
    /// The node is not stored in this heap
    #[error("node is not a member of this heap")]
    NotMember,
}

/// Failure reported by an enter or exit hook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (code {code})")]
pub struct HookError {
    code: i32,
    reason: &'static str,
}

impl HookError {
    /// Creates a hook error with a caller-defined code and reason
    pub const fn new(code: i32, reason: &'static str) -> Self {
        Self { code, reason }
    }

    /// The caller-defined error code
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The caller-defined reason
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// An object that can be tracked by a heap
///
/// Implementors embed a [`NodeHandle`] and hand it out here. The heap writes
/// the node's current slot into that handle every time the node moves.
///
/// # Example
///
/// ```rust
/// use indexed_binheap::{HeapNode, NodeHandle};
///
/// struct Timer {
///     deadline: u64,
///     handle: NodeHandle,
/// }
///
/// impl HeapNode for Timer {
///     fn heap_handle(&self) -> &NodeHandle {
///         &self.handle
///     }
/// }
/// ```
pub trait HeapNode {
    /// Returns the handle embedded in this node
    fn heap_handle(&self) -> &NodeHandle;
}

/// Ordering predicate and lifecycle hooks for a heap
///
/// `compare` must be a strict weak ordering; the heap cannot check this and
/// its order invariant only holds if the caller honours it.
///
/// Hooks run while the heap's internal lock is held, so they must not call
/// back into the same heap.
pub trait BinHeapOps<N: ?Sized> {
    /// Returns true iff `a` must sort before `b`
    fn compare(&self, a: &N, b: &N) -> bool;

    /// Called right before `node` is inserted
    ///
    /// Returning an error aborts the insert with no change to the heap.
    fn on_insert(&self, _node: &N) -> Result<(), HookError> {
        Ok(())
    }

    /// Called right after `node` has been removed
    ///
    /// The removal has already happened; an error is only logged.
    fn on_remove(&self, _node: &N) -> Result<(), HookError> {
        Ok(())
    }
}

impl<N: ?Sized, O: BinHeapOps<N> + ?Sized> BinHeapOps<N> for &O {
    fn compare(&self, a: &N, b: &N) -> bool {
        (**self).compare(a, b)
    }

    fn on_insert(&self, node: &N) -> Result<(), HookError> {
        (**self).on_insert(node)
    }

    fn on_remove(&self, node: &N) -> Result<(), HookError> {
        (**self).on_remove(node)
    }
}

impl<N: ?Sized, O: BinHeapOps<N> + ?Sized> BinHeapOps<N> for Arc<O> {
    fn compare(&self, a: &N, b: &N) -> bool {
        (**self).compare(a, b)
    }

    fn on_insert(&self, node: &N) -> Result<(), HookError> {
        (**self).on_insert(node)
    }

    fn on_remove(&self, node: &N) -> Result<(), HookError> {
        (**self).on_remove(node)
    }
}

/// Orders nodes by their [`Ord`] implementation, smallest first
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdOps;

impl<N: Ord + ?Sized> BinHeapOps<N> for OrdOps {
    fn compare(&self, a: &N, b: &N) -> bool {
        a.cmp(b) == Ordering::Less
    }
}

/// Adapts a plain `Fn(&N, &N) -> bool` predicate into a hook-less ops table
///
/// ```rust
/// use indexed_binheap::{BinHeap, CompareFn, HeapConfig, Node};
///
/// // max-heap on the payload
/// let heap = BinHeap::new(
///     HeapConfig::default(),
///     CompareFn(|a: &Node<i32>, b: &Node<i32>| a.value() > b.value()),
/// )
/// .unwrap();
/// heap.insert(Node::shared(1)).unwrap();
/// heap.insert(Node::shared(7)).unwrap();
/// assert_eq!(*heap.remove_root().unwrap().value(), 7);
/// ```
#[derive(Clone, Copy)]
pub struct CompareFn<F>(pub F);

impl<F> fmt::Debug for CompareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompareFn").finish_non_exhaustive()
    }
}

impl<N: ?Sized, F: Fn(&N, &N) -> bool> BinHeapOps<N> for CompareFn<F> {
    fn compare(&self, a: &N, b: &N) -> bool {
        (self.0)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ord_ops_is_strict() {
        assert!(OrdOps.compare(&1, &2));
        assert!(!OrdOps.compare(&2, &1));
        assert!(!OrdOps.compare(&2, &2));
    }

    #[test]
    fn test_borrowed_ops_forward() {
        let ops = CompareFn(|a: &i32, b: &i32| a > b);
        let borrowed = &ops;
        assert!(borrowed.compare(&3, &1));
        assert_eq!(borrowed.on_insert(&3), Ok(()));
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError::new(-22, "queue is frozen");
        assert_eq!(err.code(), -22);
        assert_eq!(err.to_string(), "queue is frozen (code -22)");
        assert_eq!(
            HeapError::Rejected(err).to_string(),
            "insert rejected by enter hook: queue is frozen (code -22)"
        );
    }
}
