use core::ptr::NonNull;

use crate::layout;
use crate::{BPlusTreeError, BPlusTreeMap, NodeHdr, NodeTag};

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    /// Remove the entry for `key`, returning its value if present.
    ///
    /// Underflow is repaired bottom-up: each branch on the path redistributes
    /// from a sibling when possible and otherwise merges, all the way up to
    /// (and including) the root.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let root = self.root?;
        let value = unsafe { self.remove_rec(root, key) }.map(|(v, _)| v);
        if value.is_some() {
            self.len_count -= 1;
            self.generation = self.generation.wrapping_add(1);
            unsafe {
                self.collapse_root_if_needed();
            }
        }
        value
    }

    pub fn remove_item(&mut self, key: &K) -> Result<V, BPlusTreeError> {
        self.remove(key).ok_or(BPlusTreeError::KeyNotFound)
    }

    /// Returns `(value, child_underflowed)` where `child_underflowed` tells
    /// the caller whether `node` itself now holds fewer than the minimum
    /// number of keys for a non-root node of its kind.
    unsafe fn remove_rec(&mut self, node: NonNull<u8>, key: &K) -> Option<(V, bool)> {
        let hdr = &*(node.as_ptr() as *const NodeHdr);
        match hdr.tag {
            NodeTag::Leaf => self.remove_from_leaf(node, key).map(|v| {
                let parts = layout::carve_leaf::<K, V>(node, &self.leaf_layout);
                let len = (*parts.hdr).len as usize;
                (v, len < self.min_leaf_len())
            }),
            NodeTag::Branch => self.remove_from_branch(node, key),
        }
    }

    unsafe fn remove_from_leaf(&mut self, leaf: NonNull<u8>, key: &K) -> Option<V> {
        let parts = layout::carve_leaf::<K, V>(leaf, &self.leaf_layout);
        let hdr = &mut *parts.hdr;
        let len = hdr.len as usize;
        if len == 0 {
            return None;
        }

        let keys = core::slice::from_raw_parts(parts.keys_ptr as *const K, len);
        let idx = self.binary_search_keys(keys, key).ok()?;

        let keys_ptr = parts.keys_ptr as *mut K;
        let vals_ptr = parts.vals_ptr as *mut V;
        let removed_key = core::ptr::read(keys_ptr.add(idx));
        let removed_val = core::ptr::read(vals_ptr.add(idx));

        if idx + 1 < len {
            core::ptr::copy(keys_ptr.add(idx + 1), keys_ptr.add(idx), len - idx - 1);
            core::ptr::copy(vals_ptr.add(idx + 1), vals_ptr.add(idx), len - idx - 1);
        }

        hdr.len = (len - 1) as u16;
        drop(removed_key);
        Some(removed_val)
    }

    unsafe fn remove_from_branch(&mut self, branch: NonNull<u8>, key: &K) -> Option<(V, bool)> {
        let (child, child_idx) = self.child_for_key(branch, key)?;
        let (value, child_underflowed) = self.remove_rec(child, key)?;

        if child_underflowed {
            self.fix_child_underflow(branch, child_idx);
        }

        let parts = layout::carve_branch::<K>(branch, &self.branch_layout);
        let len = (*parts.hdr).len as usize;
        Some((value, len < self.min_branch_len()))
    }

    unsafe fn fix_child_underflow(&mut self, parent: NonNull<u8>, child_idx: usize) {
        let parts = layout::carve_branch::<K>(parent, &self.branch_layout);
        let child_ptr = *(parts.children_ptr.add(child_idx) as *const *mut u8);
        let child = match NonNull::new(child_ptr) {
            Some(c) => c,
            None => return,
        };
        let child_hdr = &*(child.as_ptr() as *const NodeHdr);
        match child_hdr.tag {
            NodeTag::Leaf => {
                self.fix_leaf_underflow(parent, child_idx, child);
            }
            NodeTag::Branch => {
                self.fix_branch_underflow(parent, child_idx, child);
            }
        }
    }

    /// Repair an underfull leaf at `child_idx` by redistributing from a
    /// sibling or, failing that, merging with one.
    unsafe fn fix_leaf_underflow(&mut self, parent: NonNull<u8>, child_idx: usize, child: NonNull<u8>) {
        let min_keys = self.min_leaf_len();
        let child_parts = layout::carve_leaf::<K, V>(child, &self.leaf_layout);
        let child_hdr = &mut *child_parts.hdr;
        let child_len = child_hdr.len as usize;
        if child_len >= min_keys {
            return;
        }

        let parent_parts = layout::carve_branch::<K>(parent, &self.branch_layout);
        let parent_len = (*parent_parts.hdr).len as usize;

        // Borrow from left sibling.
        if child_idx > 0 {
            let left_ptr = *(parent_parts.children_ptr.add(child_idx - 1) as *const *mut u8);
            let left = NonNull::new_unchecked(left_ptr);
            let left_parts = layout::carve_leaf::<K, V>(left, &self.leaf_layout);
            let left_hdr = &mut *left_parts.hdr;
            let left_len = left_hdr.len as usize;
            if left_len > min_keys {
                let borrow_key =
                    core::ptr::read((left_parts.keys_ptr as *const K).add(left_len - 1));
                let borrow_val =
                    core::ptr::read((left_parts.vals_ptr as *const V).add(left_len - 1));
                left_hdr.len = (left_len - 1) as u16;

                let child_keys_ptr = child_parts.keys_ptr as *mut K;
                let child_vals_ptr = child_parts.vals_ptr as *mut V;
                if child_len > 0 {
                    core::ptr::copy(child_keys_ptr, child_keys_ptr.add(1), child_len);
                    core::ptr::copy(child_vals_ptr, child_vals_ptr.add(1), child_len);
                }
                self.write_kv_at(child_keys_ptr, child_vals_ptr, 0, borrow_key, borrow_val);
                child_hdr.len = (child_len + 1) as u16;

                let new_sep = self.key_clone_at(left_parts.keys_ptr as *const K, left_len - 1);
                self.write_key_at(parent_parts.keys_ptr as *mut K, child_idx - 1, new_sep);
                return;
            }
        }

        // Borrow from right sibling.
        if child_idx + 1 <= parent_len {
            let right_ptr = *(parent_parts.children_ptr.add(child_idx + 1) as *const *mut u8);
            if let Some(right) = NonNull::new(right_ptr) {
                let right_parts = layout::carve_leaf::<K, V>(right, &self.leaf_layout);
                let right_hdr = &mut *right_parts.hdr;
                let right_len = right_hdr.len as usize;
                if right_len > min_keys {
                    let borrow_key = core::ptr::read(right_parts.keys_ptr as *const K);
                    let borrow_val = core::ptr::read(right_parts.vals_ptr as *const V);

                    if right_len > 1 {
                        core::ptr::copy(
                            (right_parts.keys_ptr as *mut K).add(1),
                            right_parts.keys_ptr as *mut K,
                            right_len - 1,
                        );
                        core::ptr::copy(
                            (right_parts.vals_ptr as *mut V).add(1),
                            right_parts.vals_ptr as *mut V,
                            right_len - 1,
                        );
                    }
                    right_hdr.len = (right_len - 1) as u16;

                    let child_keys_ptr = child_parts.keys_ptr as *mut K;
                    let child_vals_ptr = child_parts.vals_ptr as *mut V;
                    self.write_kv_at(
                        child_keys_ptr,
                        child_vals_ptr,
                        child_len,
                        borrow_key,
                        borrow_val,
                    );
                    child_hdr.len = (child_len + 1) as u16;

                    if right_hdr.len > 0 {
                        let new_sep = self.key_clone_at(right_parts.keys_ptr as *const K, 0);
                        self.write_key_at(parent_parts.keys_ptr as *mut K, child_idx, new_sep);
                    }
                    return;
                }
            }
        }

        // No sibling can spare a key; merge.
        if child_idx > 0 {
            self.merge_leaf_siblings(parent, child_idx - 1, child_idx);
        } else {
            self.merge_leaf_siblings(parent, child_idx, child_idx + 1);
        }
    }

    unsafe fn merge_leaf_siblings(&mut self, parent: NonNull<u8>, left_idx: usize, right_idx: usize) {
        let parent_parts = layout::carve_branch::<K>(parent, &self.branch_layout);
        let parent_len = (*parent_parts.hdr).len as usize;

        let left_ptr = *(parent_parts.children_ptr.add(left_idx) as *const *mut u8);
        let right_ptr = *(parent_parts.children_ptr.add(right_idx) as *const *mut u8);
        let left = NonNull::new_unchecked(left_ptr);
        let right = NonNull::new_unchecked(right_ptr);

        let left_parts = layout::carve_leaf::<K, V>(left, &self.leaf_layout);
        let right_parts = layout::carve_leaf::<K, V>(right, &self.leaf_layout);
        let left_len = (*left_parts.hdr).len as usize;
        let right_len = (*right_parts.hdr).len as usize;

        for i in 0..right_len {
            let (k, v) = self.read_kv_at(
                right_parts.keys_ptr as *const K,
                right_parts.vals_ptr as *const V,
                i,
            );
            self.write_kv_at(
                left_parts.keys_ptr as *mut K,
                left_parts.vals_ptr as *mut V,
                left_len + i,
                k,
                v,
            );
        }
        (*left_parts.hdr).len = (left_len + right_len) as u16;

        let right_next = *right_parts.next_ptr;
        *left_parts.next_ptr = right_next;
        if let Some(prev_off) = self.leaf_layout.prev_off {
            if !right_next.is_null() {
                let prev_slot = right_next.add(prev_off) as *mut *mut u8;
                *prev_slot = left.as_ptr();
            }
        }

        self.pool.release_leaf(right, &self.leaf_layout);

        let keys_ptr = parent_parts.keys_ptr as *mut K;
        let removed_key = core::ptr::read(keys_ptr.add(left_idx));
        if parent_len > left_idx + 1 {
            core::ptr::copy(
                keys_ptr.add(left_idx + 1),
                keys_ptr.add(left_idx),
                parent_len - left_idx - 1,
            );
        }

        let children_ptr = parent_parts.children_ptr as *mut *mut u8;
        core::ptr::copy(
            children_ptr.add(right_idx + 1),
            children_ptr.add(right_idx),
            parent_len - right_idx,
        );
        (*parent_parts.hdr).len = (parent_len - 1) as u16;
        drop(removed_key);
    }

    /// Repair an underfull branch at `child_idx` by redistributing from a
    /// sibling branch or, failing that, merging with one.
    unsafe fn fix_branch_underflow(&mut self, parent: NonNull<u8>, child_idx: usize, child: NonNull<u8>) {
        let min_keys = self.min_branch_len();
        let child_parts = layout::carve_branch::<K>(child, &self.branch_layout);
        let child_len = (*child_parts.hdr).len as usize;
        if child_len >= min_keys {
            return;
        }

        let parent_parts = layout::carve_branch::<K>(parent, &self.branch_layout);
        let parent_len = (*parent_parts.hdr).len as usize;

        // Borrow from left sibling branch: rotate through parent[child_idx-1].
        if child_idx > 0 {
            let left_ptr = *(parent_parts.children_ptr.add(child_idx - 1) as *const *mut u8);
            let left = NonNull::new_unchecked(left_ptr);
            let left_parts = layout::carve_branch::<K>(left, &self.branch_layout);
            let left_len = (*left_parts.hdr).len as usize;
            if left_len > min_keys {
                let parent_keys_ptr = parent_parts.keys_ptr as *mut K;
                let old_sep = core::ptr::read((parent_keys_ptr as *const K).add(child_idx - 1));

                let moved_child = *(left_parts.children_ptr.add(left_len) as *const *mut u8);
                let moved_key =
                    core::ptr::read((left_parts.keys_ptr as *const K).add(left_len - 1));

                let child_keys_ptr = child_parts.keys_ptr as *mut K;
                let child_children_ptr = child_parts.children_ptr as *mut *mut u8;
                core::ptr::copy(child_keys_ptr, child_keys_ptr.add(1), child_len);
                core::ptr::copy(child_children_ptr, child_children_ptr.add(1), child_len + 1);
                self.write_key_at(child_keys_ptr, 0, old_sep);
                *child_children_ptr = moved_child;
                (*child_parts.hdr).len = (child_len + 1) as u16;

                (*left_parts.hdr).len = (left_len - 1) as u16;
                self.write_key_at(parent_keys_ptr, child_idx - 1, moved_key);
                return;
            }
        }

        // Borrow from right sibling branch: rotate through parent[child_idx].
        if child_idx + 1 <= parent_len {
            let right_ptr = *(parent_parts.children_ptr.add(child_idx + 1) as *const *mut u8);
            if let Some(right) = NonNull::new(right_ptr) {
                let right_parts = layout::carve_branch::<K>(right, &self.branch_layout);
                let right_len = (*right_parts.hdr).len as usize;
                if right_len > min_keys {
                    let parent_keys_ptr = parent_parts.keys_ptr as *mut K;
                    let old_sep = core::ptr::read((parent_keys_ptr as *const K).add(child_idx));

                    let moved_child = *(right_parts.children_ptr as *const *mut u8);
                    let moved_key = core::ptr::read(right_parts.keys_ptr as *const K);

                    let child_keys_ptr = child_parts.keys_ptr as *mut K;
                    let child_children_ptr = child_parts.children_ptr as *mut *mut u8;
                    self.write_key_at(child_keys_ptr, child_len, old_sep);
                    *child_children_ptr.add(child_len + 1) = moved_child;
                    (*child_parts.hdr).len = (child_len + 1) as u16;

                    let right_keys_ptr = right_parts.keys_ptr as *mut K;
                    let right_children_ptr = right_parts.children_ptr as *mut *mut u8;
                    if right_len > 1 {
                        core::ptr::copy(right_keys_ptr.add(1), right_keys_ptr, right_len - 1);
                    }
                    core::ptr::copy(right_children_ptr.add(1), right_children_ptr, right_len);
                    (*right_parts.hdr).len = (right_len - 1) as u16;

                    self.write_key_at(parent_keys_ptr, child_idx, moved_key);
                    return;
                }
            }
        }

        // No sibling can spare a key; merge, pulling the parent separator down.
        if child_idx > 0 {
            self.merge_branch_siblings(parent, child_idx - 1, child_idx);
        } else {
            self.merge_branch_siblings(parent, child_idx, child_idx + 1);
        }
    }

    unsafe fn merge_branch_siblings(&mut self, parent: NonNull<u8>, left_idx: usize, right_idx: usize) {
        let parent_parts = layout::carve_branch::<K>(parent, &self.branch_layout);
        let parent_len = (*parent_parts.hdr).len as usize;

        let left_ptr = *(parent_parts.children_ptr.add(left_idx) as *const *mut u8);
        let right_ptr = *(parent_parts.children_ptr.add(right_idx) as *const *mut u8);
        let left = NonNull::new_unchecked(left_ptr);
        let right = NonNull::new_unchecked(right_ptr);

        let left_parts = layout::carve_branch::<K>(left, &self.branch_layout);
        let right_parts = layout::carve_branch::<K>(right, &self.branch_layout);
        let left_len = (*left_parts.hdr).len as usize;
        let right_len = (*right_parts.hdr).len as usize;

        let parent_keys_ptr = parent_parts.keys_ptr as *mut K;
        let sep_key = core::ptr::read((parent_keys_ptr as *const K).add(left_idx));
        self.write_key_at(left_parts.keys_ptr as *mut K, left_len, sep_key);

        for i in 0..right_len {
            let k = core::ptr::read((right_parts.keys_ptr as *const K).add(i));
            self.write_key_at(left_parts.keys_ptr as *mut K, left_len + 1 + i, k);
        }
        let left_children_ptr = left_parts.children_ptr as *mut *mut u8;
        let right_children_ptr = right_parts.children_ptr as *const *mut u8;
        for i in 0..=right_len {
            *left_children_ptr.add(left_len + 1 + i) = *right_children_ptr.add(i);
        }
        (*left_parts.hdr).len = (left_len + 1 + right_len) as u16;

        self.pool.release_branch(right, &self.branch_layout);

        if parent_len > left_idx + 1 {
            core::ptr::copy(
                parent_keys_ptr.add(left_idx + 1),
                parent_keys_ptr.add(left_idx),
                parent_len - left_idx - 1,
            );
        }
        let parent_children_ptr = parent_parts.children_ptr as *mut *mut u8;
        core::ptr::copy(
            parent_children_ptr.add(right_idx + 1),
            parent_children_ptr.add(right_idx),
            parent_len - right_idx,
        );
        (*parent_parts.hdr).len = (parent_len - 1) as u16;
    }

    /// If the root is a branch with no separator keys left, replace it with
    /// its sole remaining child. Leaf roots are never collapsed away.
    unsafe fn collapse_root_if_needed(&mut self) {
        let root = match self.root {
            Some(r) => r,
            None => return,
        };
        let hdr = &*(root.as_ptr() as *const NodeHdr);
        if hdr.tag != NodeTag::Branch {
            return;
        }
        let parts = layout::carve_branch::<K>(root, &self.branch_layout);
        if (*parts.hdr).len != 0 {
            return;
        }
        let child_ptr = *(parts.children_ptr as *const *mut u8);
        self.pool.release_branch(root, &self.branch_layout);
        self.root = NonNull::new(child_ptr);
        if self.root.is_none() {
            self.len_count = 0;
        }
    }
}
