#![no_std]

extern crate alloc;

use core::marker::PhantomData;
use core::ptr::NonNull;

mod bulk_load;
mod common;
mod delete;
mod error;
mod get;
mod insert;
mod iterate;
mod layout;
mod node_alloc;
mod pool;

pub use error::{BPlusTreeError, BTreeResult, KeyResult, ModifyResult};
pub use iterate::{Keys, RangeCursor, Values};
pub use layout::{align_up, BranchLayout, LeafLayout, NodeHdr, NodeTag};
pub use node_alloc::{alloc_raw, dealloc_raw};
pub use pool::PoolStats;

use layout::{carve_branch, carve_leaf};
use pool::NodePool;

/// Raw-memory B+ tree map with fixed-size leaf and branch nodes.
///
/// Every node is a single heap allocation carved according to `leaf_layout`
/// or `branch_layout` (see [`layout`]). Leaves are linked into a doubly
/// linked list so range scans and reverse iteration never touch a branch.
/// Node allocation is routed through a bounded free list (`pool`) so the
/// steady-state churn of split/merge under repeated insert/remove doesn't
/// hit the global allocator on every operation. `generation` is bumped on
/// every structural mutation so a live [`RangeCursor`] can tell whether the
/// tree moved out from under it.
pub struct BPlusTreeMap<K, V> {
    /// Root node (points to a node header at offset 0), or `None` if empty.
    root: Option<NonNull<u8>>,

    /// Fixed per-kind layouts computed from byte budgets and K/V sizes.
    leaf_layout: LeafLayout,
    branch_layout: BranchLayout,

    /// Total number of key-value pairs currently stored.
    len_count: usize,
    /// Bumped on every insert/remove; used to invalidate outstanding cursors.
    generation: u64,
    pool: NodePool,

    _marker: PhantomData<(K, V)>,
}

impl<K, V> BPlusTreeMap<K, V> {
    /// Common cache line size assumption (bytes).
    pub const CACHE_LINE_BYTES: usize = 64;
    /// Free-list capacity used by constructors that don't specify one.
    pub const DEFAULT_POOL_CAP: usize = 64;

    /// Construct with explicit byte budgets for leaves and branches, and the
    /// default node pool capacity. Starts empty; the root is allocated on
    /// first insert. Used by [`Self::bulk_load`], which builds its own tree
    /// shape directly rather than going through repeated `insert` calls.
    pub fn with_budgets(leaf_bytes: usize, branch_bytes: usize) -> Self {
        let leaf_layout = LeafLayout::compute::<K, V>(leaf_bytes, true);
        let branch_layout = BranchLayout::compute::<K>(branch_bytes);
        Self {
            root: None,
            leaf_layout,
            branch_layout,
            len_count: 0,
            generation: 0,
            pool: NodePool::new(Self::DEFAULT_POOL_CAP),
            _marker: PhantomData,
        }
    }

    /// Construct using cache-line counts for leaf and branch nodes, at
    /// 64 bytes per line.
    pub fn with_cache_lines(leaf_lines: usize, branch_lines: usize) -> Self {
        let lb = leaf_lines.saturating_mul(Self::CACHE_LINE_BYTES);
        let bb = branch_lines.saturating_mul(Self::CACHE_LINE_BYTES);
        Self::with_budgets(lb, bb)
    }

    /// Returns the configured layout for leaf nodes.
    pub fn leaf_layout(&self) -> &LeafLayout {
        &self.leaf_layout
    }

    /// Returns the configured layout for branch nodes.
    pub fn branch_layout(&self) -> &BranchLayout {
        &self.branch_layout
    }

    /// Hit/miss/occupancy counters for the leaf and branch free lists,
    /// in that order.
    pub fn pool_stats(&self) -> (PoolStats, PoolStats) {
        (self.pool.leaf_stats(), self.pool.branch_stats())
    }

    pub fn len(&self) -> usize {
        self.len_count
    }

    pub fn is_empty(&self) -> bool {
        self.len_count == 0
    }

    /// Drop every stored key and value and free every node, returning the
    /// tree to the empty state. Freed node blocks are pushed onto the pool
    /// rather than deallocated, so a clear-and-refill cycle reuses them.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe {
                self.free_subtree(root, true);
            }
        }
        self.len_count = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    unsafe fn drop_leaf_payload(&self, leaf: NonNull<u8>) {
        let parts = carve_leaf::<K, V>(leaf, &self.leaf_layout);
        let len = (*parts.hdr).len as usize;
        for i in 0..len {
            core::ptr::drop_in_place((parts.keys_ptr as *mut K).add(i));
            core::ptr::drop_in_place((parts.vals_ptr as *mut V).add(i));
        }
    }

    unsafe fn drop_branch_keys(&self, branch: NonNull<u8>) {
        let parts = carve_branch::<K>(branch, &self.branch_layout);
        let len = (*parts.hdr).len as usize;
        for i in 0..len {
            core::ptr::drop_in_place((parts.keys_ptr as *mut K).add(i));
        }
    }

    /// Recursively drop every live key/value under `node` and dispose of
    /// each node block. `to_pool` selects between returning blocks to the
    /// free list (used by [`Self::clear`], which keeps the tree around) and
    /// deallocating them directly (used by `Drop`, where the pool itself is
    /// about to be torn down).
    unsafe fn free_subtree(&mut self, node: NonNull<u8>, to_pool: bool) {
        let hdr = &*(node.as_ptr() as *const NodeHdr);
        match hdr.tag {
            NodeTag::Leaf => {
                self.drop_leaf_payload(node);
                if to_pool {
                    self.pool.release_leaf(node, &self.leaf_layout);
                } else {
                    dealloc_raw(node, self.leaf_layout.bytes, self.leaf_layout.max_align);
                }
            }
            NodeTag::Branch => {
                let parts = carve_branch::<K>(node, &self.branch_layout);
                let len = (*parts.hdr).len as usize;
                for i in 0..=len {
                    let child_ptr = *(parts.children_ptr.add(i) as *const *mut u8);
                    if let Some(child) = NonNull::new(child_ptr) {
                        self.free_subtree(child, to_pool);
                    }
                }
                self.drop_branch_keys(node);
                if to_pool {
                    self.pool.release_branch(node, &self.branch_layout);
                } else {
                    dealloc_raw(node, self.branch_layout.bytes, self.branch_layout.max_align);
                }
            }
        }
    }
}

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    /// Construct a tree sized for `capacity` key-value pairs per node, with
    /// the default node pool capacity. `capacity` must be at least 4.
    pub fn new(capacity: usize) -> Result<Self, BPlusTreeError> {
        Self::with_pool_cap(capacity, Self::DEFAULT_POOL_CAP)
    }

    /// Like [`Self::new`], with an explicit free-list capacity per node kind.
    pub fn with_pool_cap(capacity: usize, pool_cap: usize) -> Result<Self, BPlusTreeError> {
        if capacity < 4 {
            return Err(BPlusTreeError::invalid_capacity(capacity, 4));
        }
        let cap_u16 = core::cmp::min(capacity as u16, u16::MAX as usize) as u16;
        let leaf_layout = LeafLayout::compute_for_cap::<K, V>(cap_u16, true);
        let branch_layout = BranchLayout::compute_for_cap::<K>(cap_u16);
        let mut pool = NodePool::new(pool_cap);
        let root = unsafe {
            pool.acquire_leaf(&leaf_layout)
                .ok_or_else(|| BPlusTreeError::allocation_error("leaf", "out of memory"))?
        };
        Ok(Self {
            root: Some(root),
            leaf_layout,
            branch_layout,
            len_count: 0,
            generation: 0,
            pool,
            _marker: PhantomData,
        })
    }

    /// Like [`Self::new`], with node allocation going straight to the global
    /// allocator on every acquire/release instead of through a free list.
    pub fn without_pool(capacity: usize) -> Result<Self, BPlusTreeError> {
        Self::with_pool_cap(capacity, 0)
    }
}

impl<K, V> Drop for BPlusTreeMap<K, V> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe {
                self.free_subtree(root, false);
            }
        }
        unsafe {
            self.pool.drain(&self.leaf_layout, &self.branch_layout);
        }
    }
}
