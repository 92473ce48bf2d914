//! Stress tests that push the heap across storage block boundaries
//!
//! These tests perform large numbers of operations in various patterns
//! to catch edge cases in growth and verify correctness under load.

use indexed_binheap::storage::BLOCK_SIZE;
use indexed_binheap::{BinHeap, HeapConfig, Node, OrdOps};
use std::sync::Arc;

type IntHeap = BinHeap<Node<u32>, OrdOps>;

fn new_heap() -> IntHeap {
    BinHeap::new(HeapConfig::default(), OrdOps).unwrap()
}

#[test]
fn test_growth_past_first_block() {
    let heap = new_heap();
    let count = BLOCK_SIZE as u32 + 1;
    let nodes: Vec<_> = (0..count).rev().map(Node::shared).collect();

    for node in &nodes {
        heap.insert(node.clone()).unwrap();
    }
    assert_eq!(heap.len(), count as usize);
    assert_eq!(heap.capacity(), 2 * BLOCK_SIZE as u32);

    // every node is still findable at the slot its handle names
    for node in &nodes {
        let idx = node.handle().index().unwrap();
        assert!(Arc::ptr_eq(&heap.find(idx).unwrap(), node));
    }

    for expected in 0..count {
        assert_eq!(*heap.remove_root().unwrap().value(), expected);
    }
    assert!(heap.is_empty());
}

#[test]
fn test_capacity_never_shrinks() {
    let heap = new_heap();
    for i in 0..2000 {
        heap.insert(Node::shared(i)).unwrap();
    }
    let grown = heap.capacity();
    assert_eq!(grown, 2048);

    heap.drain();
    assert_eq!(heap.capacity(), grown);

    for i in 0..2000 {
        heap.insert(Node::shared(i)).unwrap();
    }
    assert_eq!(heap.capacity(), grown);
}

#[test]
fn test_massive_operations() {
    let heap = new_heap();
    for i in 0..20_000 {
        heap.insert(Node::shared(i)).unwrap();
    }
    assert_eq!(heap.len(), 20_000);

    for i in 0..20_000 {
        assert_eq!(*heap.remove_root().unwrap().value(), i);
    }
}

#[test]
fn test_alternating_ops() {
    let heap = new_heap();
    let mut removed = Vec::new();
    for i in 0..1500u32 {
        heap.insert(Node::shared(i * 2)).unwrap();
        heap.insert(Node::shared(i * 2 + 1)).unwrap();
        removed.push(*heap.remove_root().unwrap().value());
    }
    assert_eq!(removed, (0..1500).collect::<Vec<_>>());
    assert_eq!(heap.len(), 1500);
}

#[test]
fn test_remove_everything_in_insertion_order() {
    let heap = new_heap();
    // pseudo-random priorities from a linear congruential generator
    let mut seed = 12345u32;
    let nodes: Vec<_> = (0..3000)
        .map(|_| {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            Node::shared(seed >> 8)
        })
        .collect();
    for node in &nodes {
        heap.insert(node.clone()).unwrap();
    }

    for (removed, node) in nodes.iter().enumerate() {
        heap.remove(node).unwrap();
        if removed % 500 == 0 {
            let len = heap.len() as u32;
            for idx in 1..len {
                let child = heap.find(idx).unwrap();
                let parent = heap.find((idx - 1) / 2).unwrap();
                assert!(parent.value() <= child.value());
                assert_eq!(child.handle().index(), Some(idx));
            }
        }
    }
    assert!(heap.is_empty());
}

#[test]
fn test_preallocated_capacity() {
    let heap = BinHeap::new(HeapConfig::default().with_capacity(5000), OrdOps).unwrap();
    assert_eq!(heap.capacity(), 5120);
    for i in 0..5000u32 {
        heap.insert(Node::shared(i)).unwrap();
    }
    assert_eq!(heap.capacity(), 5120);
}
