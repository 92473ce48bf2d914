//! Indexed binary heap for scheduling subsystems
//!
//! This crate provides [`BinHeap`], a resizable binary min-heap meant to be
//! embedded in higher-level schedulers and ordering subsystems.
//!
//! # Features
//!
//! - **Embedded handles**: every node carries a [`NodeHandle`] recording its
//!   current slot, so any member can be removed or re-sorted in O(log n)
//! - **Pointer-stable storage**: slots live in 512-entry blocks behind up to
//!   three levels of indirection ([`storage`]); growth never moves a slot
//! - **Caller-defined order**: a [`BinHeapOps`] table supplies the ordering
//!   predicate and optional enter/exit hooks
//! - **Selectable locking**: no lock, an exclusive mutex, or a reader-writer
//!   lock, chosen once through [`HeapFeatures`]
//!
//! # Example
//!
//! ```rust
//! use indexed_binheap::{BinHeap, HeapConfig, HeapFeatures, Node, OrdOps};
//!
//! let config = HeapConfig::default().with_features(HeapFeatures::RWLOCK);
//! let heap = BinHeap::new(config, OrdOps).unwrap();
//!
//! for priority in [5, 3, 8, 1, 4] {
//!     heap.insert(Node::shared(priority)).unwrap();
//! }
//!
//! let drained: Vec<i32> = heap.drain().iter().map(|n| *n.value()).collect();
//! assert_eq!(drained, vec![1, 3, 4, 5, 8]);
//! ```

pub mod binheap;
pub mod config;
pub mod lock;
pub mod node;
pub mod storage;
pub mod traits;

// Re-export the main types for convenience
pub use binheap::{heap_is_empty, heap_size, BinHeap};
pub use config::HeapConfig;
pub use lock::{HeapFeatures, LockMode};
pub use node::{Node, NodeHandle};
pub use storage::IndexedStorage;
pub use traits::{BinHeapOps, CompareFn, HeapError, HeapNode, HookError, OrdOps};
