use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::layout;
use crate::{BPlusTreeError, BPlusTreeMap};

/// Split `total` items into chunks of roughly `target` each, summing to
/// `total`, with every chunk within `[min, cap]` once more than one chunk
/// exists (a lone chunk becomes the root and isn't subject to `min`).
///
/// The greedy pass below can leave a trailing chunk underfull when `total`
/// isn't a multiple of `target`. We repair that in three steps, each
/// attempted only if the previous one doesn't apply: redistribute a few
/// items from the predecessor, merge the trailing chunk into the
/// predecessor if the combined size still fits `cap`, or as a last resort
/// split the combined size evenly across both positions.
fn chunk_sizes(total: usize, target: usize, min: usize, cap: usize) -> Vec<usize> {
    let mut chunks: Vec<usize> = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let take = core::cmp::min(target, remaining);
        chunks.push(take);
        remaining -= take;
    }

    if chunks.len() > 1 {
        let last_idx = chunks.len() - 1;
        if chunks[last_idx] < min {
            let need = min - chunks[last_idx];
            let prev_idx = last_idx - 1;
            if chunks[prev_idx] >= min + need {
                chunks[prev_idx] -= need;
                chunks[last_idx] += need;
            } else {
                let combined = chunks[prev_idx] + chunks[last_idx];
                if combined <= cap {
                    chunks[prev_idx] = combined;
                    chunks.pop();
                } else {
                    let left = combined / 2;
                    let right = combined - left;
                    chunks[prev_idx] = left;
                    chunks[last_idx] = right;
                }
            }
        }
    }

    chunks
}

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    /// Build a tree from `pairs`, which must already be strictly increasing
    /// by key. Empty input yields an empty tree, not an error.
    ///
    /// Construction is bottom-up: leaves are packed to roughly three
    /// quarters of capacity, linked together, then grouped into branch
    /// levels using the smallest key of each right subtree as the
    /// separator, repeating until a single root remains. Whenever the
    /// greedy packing would leave a trailing leaf or branch group below the
    /// occupancy minimum, [`chunk_sizes`] repairs it by borrowing from the
    /// predecessor, merging into it, or splitting the combined total evenly
    /// between the two. This produces the same leaf/branch shape repeated
    /// `insert` calls would, without paying for incremental split
    /// bookkeeping.
    pub fn bulk_load(
        leaf_bytes: usize,
        branch_bytes: usize,
        pairs: Vec<(K, V)>,
    ) -> Result<Self, BPlusTreeError> {
        let mut tree = Self::with_budgets(leaf_bytes, branch_bytes);
        if pairs.is_empty() {
            return Ok(tree);
        }

        for w in pairs.windows(2) {
            if w[0].0 >= w[1].0 {
                return Err(BPlusTreeError::invalid_bulk_load_input(
                    "input pairs must be strictly increasing by key",
                ));
            }
        }

        let leaf_cap = tree.leaf_layout.cap as usize;
        if leaf_cap == 0 {
            return Err(BPlusTreeError::invalid_capacity(0, 1));
        }
        let min_leaf = tree.min_leaf_len().max(1);
        let target = core::cmp::max(1, (leaf_cap * 3) / 4);
        let chunks = chunk_sizes(pairs.len(), target, min_leaf, leaf_cap);

        let mut pairs = pairs.into_iter();
        let mut leaves: Vec<NonNull<u8>> = Vec::with_capacity(chunks.len());
        let mut prev_leaf: Option<NonNull<u8>> = None;
        for count in &chunks {
            let leaf = unsafe {
                tree.pool
                    .acquire_leaf(&tree.leaf_layout)
                    .ok_or_else(|| BPlusTreeError::allocation_error("leaf", "out of memory"))?
            };
            unsafe {
                let parts = layout::carve_leaf::<K, V>(leaf, &tree.leaf_layout);
                for i in 0..*count {
                    let (k, v) = pairs
                        .next()
                        .expect("chunk sizes must sum to the input length");
                    tree.write_kv_at(parts.keys_ptr as *mut K, parts.vals_ptr as *mut V, i, k, v);
                }
                (*parts.hdr).len = *count as u16;
                if let Some(prev) = prev_leaf {
                    let prev_parts = layout::carve_leaf::<K, V>(prev, &tree.leaf_layout);
                    *prev_parts.next_ptr = leaf.as_ptr();
                    if let Some(prev_off) = tree.leaf_layout.prev_off {
                        let cur_prev_slot = (leaf.as_ptr().add(prev_off)) as *mut *mut u8;
                        *cur_prev_slot = prev.as_ptr();
                    }
                }
            }
            leaves.push(leaf);
            prev_leaf = Some(leaf);
        }

        tree.len_count = chunks.iter().sum();

        let mut level: Vec<NonNull<u8>> = leaves;
        let mut separators: Vec<K> = {
            let mut seps = Vec::with_capacity(level.len().saturating_sub(1));
            for leaf in level.iter().skip(1) {
                unsafe {
                    let parts = layout::carve_leaf::<K, V>(*leaf, &tree.leaf_layout);
                    seps.push(tree.key_clone_at(parts.keys_ptr as *const K, 0));
                }
            }
            seps
        };

        while level.len() > 1 {
            let branch_cap = tree.branch_layout.cap as usize;
            if branch_cap == 0 {
                return Err(BPlusTreeError::invalid_capacity(0, 2));
            }
            let max_children = branch_cap + 1;
            let min_children = tree.min_branch_len() + 1;
            let target_children = core::cmp::max(2, (max_children * 3) / 4);
            let groups = chunk_sizes(level.len(), target_children, min_children, max_children);

            let mut new_level: Vec<NonNull<u8>> = Vec::with_capacity(groups.len());
            let mut new_separators: Vec<K> = Vec::with_capacity(groups.len().saturating_sub(1));
            let mut i = 0usize;
            for take in &groups {
                let take = *take;
                let branch = unsafe {
                    tree.pool
                        .acquire_branch(&tree.branch_layout)
                        .ok_or_else(|| BPlusTreeError::allocation_error("branch", "out of memory"))?
                };
                unsafe {
                    let parts = layout::carve_branch::<K>(branch, &tree.branch_layout);
                    let children_ptr = parts.children_ptr as *mut *mut u8;
                    for j in 0..take {
                        *children_ptr.add(j) = level[i + j].as_ptr();
                    }
                    let key_count = take - 1;
                    for j in 0..key_count {
                        let sep = separators[i + j].clone();
                        tree.write_key_at(parts.keys_ptr as *mut K, j, sep);
                    }
                    (*parts.hdr).len = key_count as u16;
                }
                if i + take < level.len() {
                    new_separators.push(separators[i + take - 1].clone());
                }
                new_level.push(branch);
                i += take;
            }
            level = new_level;
            separators = new_separators;
        }

        tree.root = Some(level[0]);
        Ok(tree)
    }
}
