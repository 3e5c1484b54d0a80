//! Bounded free lists for leaf and branch node blocks.
//!
//! Acquiring a node prefers a previously released block of the same kind over
//! a fresh heap allocation. Releasing a node pushes it back onto the free
//! list unless the list is already at capacity, in which case the block is
//! deallocated immediately. A pool with capacity zero degenerates to plain
//! alloc/dealloc on every call.

use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::layout::{BranchLayout, LeafLayout};
use crate::node_alloc::{alloc_raw, dealloc_raw, init_branch_block, init_leaf_block};

/// Hit/miss/occupancy counters for one free list.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: usize,
    pub misses: usize,
    pub current_size: usize,
}

struct FreeList {
    blocks: Vec<NonNull<u8>>,
    cap: usize,
    hits: usize,
    misses: usize,
}

impl FreeList {
    fn new(cap: usize) -> Self {
        Self {
            blocks: Vec::new(),
            cap,
            hits: 0,
            misses: 0,
        }
    }

    #[inline]
    fn acquire(&mut self) -> Option<NonNull<u8>> {
        match self.blocks.pop() {
            Some(block) => {
                self.hits += 1;
                Some(block)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Push a block back unless the list is full, in which case deallocate it.
    ///
    /// SAFETY: `block` must point to a `bytes`-sized allocation with the given
    /// `align`, with no live key/value/child payload remaining in it.
    #[inline]
    unsafe fn release(&mut self, block: NonNull<u8>, bytes: usize, align: usize) {
        if self.blocks.len() < self.cap {
            self.blocks.push(block);
        } else {
            dealloc_raw(block, bytes, align);
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits,
            misses: self.misses,
            current_size: self.blocks.len(),
        }
    }

    /// SAFETY: every block on this list must be `bytes`-sized with the given
    /// `align` and hold no live payload.
    unsafe fn drain(&mut self, bytes: usize, align: usize) {
        while let Some(block) = self.blocks.pop() {
            dealloc_raw(block, bytes, align);
        }
    }
}

/// Per-variant node pool shared by a single [`crate::BPlusTreeMap`].
pub(crate) struct NodePool {
    leaves: FreeList,
    branches: FreeList,
}

impl NodePool {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            leaves: FreeList::new(cap),
            branches: FreeList::new(cap),
        }
    }

    /// Acquire a zeroed-occupancy leaf block, reusing a free one if available.
    pub(crate) unsafe fn acquire_leaf(&mut self, layout: &LeafLayout) -> Option<NonNull<u8>> {
        if let Some(block) = self.leaves.acquire() {
            init_leaf_block(block, layout);
            Some(block)
        } else {
            let block = alloc_raw(layout.bytes, layout.max_align)?;
            init_leaf_block(block, layout);
            Some(block)
        }
    }

    /// Acquire a zeroed-occupancy branch block, reusing a free one if available.
    pub(crate) unsafe fn acquire_branch(&mut self, layout: &BranchLayout) -> Option<NonNull<u8>> {
        if let Some(block) = self.branches.acquire() {
            init_branch_block(block);
            Some(block)
        } else {
            let block = alloc_raw(layout.bytes, layout.max_align)?;
            init_branch_block(block);
            Some(block)
        }
    }

    /// Return a leaf block to the pool. The caller must have already dropped
    /// or moved out every live key/value the block held.
    pub(crate) unsafe fn release_leaf(&mut self, block: NonNull<u8>, layout: &LeafLayout) {
        self.leaves.release(block, layout.bytes, layout.max_align);
    }

    /// Return a branch block to the pool. The caller must have already
    /// dropped or moved out every live child subtree the block held.
    pub(crate) unsafe fn release_branch(&mut self, block: NonNull<u8>, layout: &BranchLayout) {
        self.branches
            .release(block, layout.bytes, layout.max_align);
    }

    pub(crate) fn leaf_stats(&self) -> PoolStats {
        self.leaves.stats()
    }

    pub(crate) fn branch_stats(&self) -> PoolStats {
        self.branches.stats()
    }

    /// Deallocate every free block still held by either list. Called from
    /// `Drop` once the tree itself has been torn down.
    pub(crate) unsafe fn drain(&mut self, leaf_layout: &LeafLayout, branch_layout: &BranchLayout) {
        self.leaves
            .drain(leaf_layout.bytes, leaf_layout.max_align);
        self.branches
            .drain(branch_layout.bytes, branch_layout.max_align);
    }
}
