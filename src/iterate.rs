use core::ops::{Bound, RangeBounds};
use core::ptr::NonNull;

use crate::layout;
use crate::{BPlusTreeError, BPlusTreeMap};

/// A forward-only, lazy cursor over a contiguous key range.
///
/// The cursor walks the leaf linked list directly rather than collecting
/// matches up front, so building one costs a single root-to-leaf descent
/// regardless of how much of the range is eventually consumed. It remembers
/// the tree's generation counter at construction time; any insert or remove
/// observed afterwards poisons it; the `Iterator` impl then simply ends,
/// while [`RangeCursor::try_next`] reports the poisoning with
/// [`BPlusTreeError::ConcurrentMutation`].
///
/// Holding a `RangeCursor` keeps the tree immutably borrowed, so under the
/// safe API mutation during iteration is already rejected at compile time;
/// the generation check exists for callers who reach the raw node pointers
/// through `unsafe` and could otherwise violate that guarantee silently.
pub struct RangeCursor<'a, K, V> {
    tree: &'a BPlusTreeMap<K, V>,
    current: Option<NonNull<u8>>,
    index: usize,
    upper: Bound<K>,
    generation: u64,
    poisoned: bool,
}

impl<'a, K: Ord + Clone, V> RangeCursor<'a, K, V> {
    /// Advance the cursor, reporting a poisoned generation explicitly instead
    /// of silently stopping.
    pub fn try_next(&mut self) -> Result<Option<(&'a K, &'a V)>, BPlusTreeError> {
        if self.poisoned {
            return Ok(None);
        }
        if self.generation != self.tree.generation {
            self.poisoned = true;
            return Err(BPlusTreeError::ConcurrentMutation);
        }
        loop {
            let cur = match self.current {
                Some(c) => c,
                None => return Ok(None),
            };
            unsafe {
                let parts = layout::carve_leaf::<K, V>(cur, &self.tree.leaf_layout);
                let len = (*parts.hdr).len as usize;
                if self.index >= len {
                    let next_ptr = *parts.next_ptr;
                    self.current = NonNull::new(next_ptr);
                    self.index = 0;
                    continue;
                }
                let kref: &'a K = &*(parts.keys_ptr as *const K).add(self.index);
                let in_bound = match &self.upper {
                    Bound::Unbounded => true,
                    Bound::Included(e) => kref <= e,
                    Bound::Excluded(e) => kref < e,
                };
                if !in_bound {
                    self.current = None;
                    return Ok(None);
                }
                let vref: &'a V = &*(parts.vals_ptr as *const V).add(self.index);
                self.index += 1;
                return Ok(Some((kref, vref)));
            }
        }
    }
}

impl<'a, K: Ord + Clone, V> Iterator for RangeCursor<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().unwrap_or(None)
    }
}

pub struct Keys<'a, K, V> {
    inner: RangeCursor<'a, K, V>,
}

impl<'a, K: Ord + Clone, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

pub struct Values<'a, K, V> {
    inner: RangeCursor<'a, K, V>,
}

impl<'a, K: Ord + Clone, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl<K: Ord + Clone, V> BPlusTreeMap<K, V> {
    pub fn items(&self) -> RangeCursor<'_, K, V> {
        self.range_cursor(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.items() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.items() }
    }

    /// `[start, end)` iteration by optional key bound, as a convenience over
    /// `range` for callers that already have `Option<&K>` endpoints.
    pub fn items_range(&self, start: Option<&K>, end: Option<&K>) -> RangeCursor<'_, K, V> {
        let sb = start.map_or(Bound::Unbounded, Bound::Included);
        let eb = end.map_or(Bound::Unbounded, Bound::Excluded);
        self.range_cursor(sb, eb)
    }

    pub fn range<R: RangeBounds<K>>(&self, r: R) -> RangeCursor<'_, K, V> {
        self.range_cursor(r.start_bound(), r.end_bound())
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.items().next()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.rightmost_leaf()?;
        unsafe {
            let parts = layout::carve_leaf::<K, V>(leaf, &self.leaf_layout);
            let len = (*parts.hdr).len as usize;
            if len == 0 {
                return None;
            }
            let k = &*(parts.keys_ptr as *const K).add(len - 1);
            let v = &*(parts.vals_ptr as *const V).add(len - 1);
            Some((k, v))
        }
    }

    fn range_cursor(&self, start: Bound<&K>, end: Bound<&K>) -> RangeCursor<'_, K, V> {
        let leaf_ptr = match start {
            Bound::Unbounded => self.leftmost_leaf(),
            Bound::Included(k) | Bound::Excluded(k) => self.leaf_for_key(k),
        };

        let mut index = 0usize;
        if let Some(leaf) = leaf_ptr {
            if let Bound::Included(s) | Bound::Excluded(s) = start {
                unsafe {
                    let parts = layout::carve_leaf::<K, V>(leaf, &self.leaf_layout);
                    let len = (*parts.hdr).len as usize;
                    let keys = core::slice::from_raw_parts(parts.keys_ptr as *const K, len);
                    index = match self.binary_search_keys(keys, s) {
                        Ok(i) => {
                            if matches!(start, Bound::Excluded(_)) {
                                i + 1
                            } else {
                                i
                            }
                        }
                        Err(i) => i,
                    };
                }
            }
        }

        let upper = match end {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Included(k) => Bound::Included(k.clone()),
            Bound::Excluded(k) => Bound::Excluded(k.clone()),
        };

        RangeCursor {
            tree: self,
            current: leaf_ptr,
            index,
            upper,
            generation: self.generation,
            poisoned: false,
        }
    }
}
