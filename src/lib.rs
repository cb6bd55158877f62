//! Ordered key-value maps backed by binary search trees with four
//! balancing strategies: height-balanced ([`AvlTreeMap`]), randomized
//! ([`TreapMap`]), self-adjusting ([`SplayTreeMap`]) and none at all
//! ([`BasicTreeMap`]).
//!
//! All four share one node representation (parent back-pointers, subtree
//! sizes) and the [`OrderedMap`] trait, which adds tree-level operations
//! the standard library maps do not offer: `split`, `join`, `merge`,
//! `mixin` and `conflict`. The [`Viewable`] trait and [`trace`] produce
//! structural snapshots for rendering or shape assertions.
//!
//! ```
//! use bbtree::{AvlTreeMap, Status};
//!
//! let mut map = AvlTreeMap::new();
//! assert_eq!(map.insert(1, "one"), Status::Success);
//! assert_eq!(map.insert(2, "two"), Status::Success);
//! assert_eq!(map.insert(1, "uno"), Status::Failed);
//! assert_eq!(map.get(&1), Some(&"one"));
//!
//! let upper = map.split(&2);
//! assert_eq!(map.len(), 1);
//! assert_eq!(upper.len(), 1);
//! ```

use std::cmp::Ordering;
use std::mem;

mod avl;
mod basic;
mod splay;
mod treap;
mod tree;
mod view;

pub use avl::AvlTreeMap;
pub use basic::BasicTreeMap;
pub use splay::SplayTreeMap;
pub use treap::TreapMap;
pub use view::{trace, ForestView, NodeView, TreeView, Viewable};

/// Outcome of a map operation that can fail in an expected, recoverable
/// way (duplicate key on insert, absent key on remove). A `Failed` result
/// always leaves the map unchanged and consistent.
#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Success,
    Failed,
}

impl Status {
    /// Whether the operation took effect.
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Whether the operation was rejected and the map left untouched.
    pub fn is_failed(self) -> bool {
        self == Status::Failed
    }
}

/// Uniform operation surface of the four map variants.
///
/// Keyed read operations take `&mut self` because the splay variant
/// restructures itself on every access; the other variants implement them
/// without mutation.
pub trait OrderedMap<K: Ord, V>: Sized {
    /// Inserts a key-value pair. Fails if the key is already present; the
    /// stored value is not overwritten.
    fn insert(&mut self, key: K, value: V) -> Status;

    /// Removes the entry with the given key. Fails if the key is absent.
    fn remove(&mut self, key: &K) -> Status;

    /// Looks up an entry by key.
    fn find(&mut self, key: &K) -> Option<(&K, &V)>;

    /// Looks up an entry by rank in key order (1-based): rank 1 is the
    /// minimum, rank `len()` the maximum. A size-guided descent, so
    /// O(height) without touching the structure.
    fn find_kth(&self, rank: usize) -> Option<(&K, &V)>;

    /// Entry with the smallest key.
    fn min(&mut self) -> Option<(&K, &V)>;

    /// Entry with the largest key.
    fn max(&mut self) -> Option<(&K, &V)>;

    /// Smallest and largest key in one call.
    fn bounds(&mut self) -> Option<(&K, &K)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    fn clear(&mut self);

    /// Visits all entries in key order without consuming the map.
    fn traverse<'a, F: FnMut(&'a K, &'a V)>(&'a self, f: F)
    where
        K: 'a,
        V: 'a;

    /// Consumes the map, yielding all entries in key order.
    fn into_each<F: FnMut(K, V)>(self, f: F);

    /// Splits the map at `key`: `self` keeps all entries with keys below
    /// `key`, the returned map takes the rest (including `key` itself when
    /// present).
    fn split(&mut self, key: &K) -> Self;

    /// Concatenates two maps. The caller guarantees that every key of
    /// `self` is less than every key of `other`; use [`OrderedMap::merge`]
    /// when the ranges are not known to be ordered.
    fn join(&mut self, other: Self) -> Status;

    /// Combines two maps. Disjoint key ranges are concatenated via
    /// [`OrderedMap::join`] (swapping first if `other` holds the smaller
    /// range); overlapping ranges fall back to element-wise
    /// [`OrderedMap::mixin`]. `other` is consumed either way; callers who
    /// must not lose conflicting entries check [`OrderedMap::conflict`]
    /// first.
    fn merge(&mut self, mut other: Self) -> Status {
        if other.is_empty() {
            return Status::Success;
        }
        if self.is_empty() {
            mem::swap(self, &mut other);
            return Status::Success;
        }
        let (overlap, self_above) = match (self.bounds(), other.bounds()) {
            (Some((self_min, self_max)), Some((other_min, other_max))) => (
                self_min <= other_max && other_min <= self_max,
                self_min > other_max,
            ),
            _ => return Status::Success,
        };
        if overlap {
            return self.mixin(other);
        }
        if self_above {
            mem::swap(self, &mut other);
        }
        self.join(other)
    }

    /// Re-inserts every entry of `other` into `self`, in key order.
    /// Entries whose key is already present are silently dropped; `self`
    /// keeps its value.
    fn mixin(&mut self, other: Self) -> Status {
        other.into_each(|key, value| {
            let _ = self.insert(key, value);
        });
        Status::Success
    }

    /// Whether the key sets of both maps intersect. O(n + m) two-pointer
    /// sweep over both in-order key sequences.
    fn conflict(&self, other: &Self) -> bool {
        let mut lhs = Vec::with_capacity(self.len());
        let mut rhs = Vec::with_capacity(other.len());
        self.traverse(|key, _| lhs.push(key));
        other.traverse(|key, _| rhs.push(key));
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            match lhs[i].cmp(rhs[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests;
