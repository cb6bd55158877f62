//! An ordered map implemented with a plain, unbalanced binary search tree.
//! Every operation is O(height) with no bound on the height: sorted
//! insertion degrades it to a linked list. Useful as a baseline and for
//! input that is known to arrive in random order.

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

use crate::tree::{adjust_upward, bind_right, max_node, min_node, Link, Node, Tree};
use crate::{OrderedMap, Status};

/// Two-way split of a detached subtree: keys below `key` go left, the rest
/// go right. Same iterative hook walk as the treap split, minus the middle.
fn split_parts<K: Ord, V>(
    root: Link<K, V, ()>,
    key: &K,
) -> (Link<K, V, ()>, Link<K, V, ()>) {
    let mut left: Link<K, V, ()> = None;
    let mut right: Link<K, V, ()> = None;
    unsafe {
        let mut left_hook = NonNull::from(&mut left);
        let mut right_hook = NonNull::from(&mut right);
        let mut left_seam: Link<K, V, ()> = None;
        let mut right_seam: Link<K, V, ()> = None;
        if let Some(mut root_ptr) = root {
            root_ptr.as_mut().parent = None;
        }
        let mut current = root;
        while let Some(mut node_ptr) = current {
            match key.cmp(&node_ptr.as_ref().key) {
                Ordering::Greater => {
                    let next = node_ptr.as_mut().right.take();
                    *left_hook.as_mut() = Some(node_ptr);
                    node_ptr.as_mut().parent = left_seam;
                    left_seam = Some(node_ptr);
                    left_hook = NonNull::from(&mut node_ptr.as_mut().right);
                    current = next;
                }
                Ordering::Less | Ordering::Equal => {
                    let next = node_ptr.as_mut().left.take();
                    *right_hook.as_mut() = Some(node_ptr);
                    node_ptr.as_mut().parent = right_seam;
                    right_seam = Some(node_ptr);
                    right_hook = NonNull::from(&mut node_ptr.as_mut().left);
                    current = next;
                }
            }
        }
        adjust_upward(left_seam);
        adjust_upward(right_seam);
    }
    (left, right)
}

/// An ordered map without rebalancing.
pub struct BasicTreeMap<K: Ord, V> {
    pub(crate) tree: Tree<K, V, ()>,
}

impl<K: Ord, V> BasicTreeMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree
            .find(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree
            .find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.tree.find(key).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Entry with the given rank in key order (1-based); `None` when the
    /// rank is 0 or past the end.
    pub fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        self.tree.find_kth(rank).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    pub fn min(&self) -> Option<(&K, &V)> {
        min_node(self.tree.root).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    pub fn max(&self) -> Option<(&K, &V)> {
        max_node(self.tree.root).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Inserts a key-value pair as a leaf. Fails if the key is present.
    pub fn insert(&mut self, key: K, value: V) -> Status {
        let (parent, mut link_ptr) = self.tree.find_slot(&key);
        unsafe {
            if link_ptr.as_ref().is_some() {
                return Status::Failed;
            }
            *link_ptr.as_mut() = Some(Node::create(parent, key, value));
        }
        adjust_upward(parent);
        Status::Success
    }

    /// Removes the entry with the given key. Fails if the key is absent.
    pub fn remove(&mut self, key: &K) -> Status {
        match self.tree.find(key) {
            None => Status::Failed,
            Some(node_ptr) => {
                let (removed, _) = self.tree.take_out(node_ptr);
                unsafe { Node::destroy(removed) };
                Status::Success
            }
        }
    }

    /// Splits the map at `key`: `self` keeps all entries with keys below
    /// `key`, the returned map takes the rest (including `key` itself when
    /// present).
    pub fn split(&mut self, key: &K) -> Self {
        let (left, right) = split_parts(self.tree.root.take(), key);
        self.tree.root = left;
        Self {
            tree: Tree::from_root(right),
        }
    }

    /// Concatenates two maps with ordered key ranges: the caller guarantees
    /// that every key of `self` is less than every key of `other`. The
    /// other tree is hung below this tree's maximum.
    pub fn join(&mut self, mut other: Self) -> Status {
        if other.is_empty() {
            return Status::Success;
        }
        let Some(max_ptr) = max_node(self.tree.root) else {
            self.tree.root = other.tree.root.take();
            return Status::Success;
        };
        bind_right(max_ptr, other.tree.root.take());
        adjust_upward(Some(max_ptr));
        Status::Success
    }
}

impl<K: Ord, V> OrderedMap<K, V> for BasicTreeMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Status {
        BasicTreeMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Status {
        BasicTreeMap::remove(self, key)
    }

    fn find(&mut self, key: &K) -> Option<(&K, &V)> {
        self.get_key_value(key)
    }

    fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        BasicTreeMap::find_kth(self, rank)
    }

    fn min(&mut self) -> Option<(&K, &V)> {
        BasicTreeMap::min(self)
    }

    fn max(&mut self) -> Option<(&K, &V)> {
        BasicTreeMap::max(self)
    }

    fn bounds(&mut self) -> Option<(&K, &K)> {
        let min_ptr = min_node(self.tree.root)?;
        let max_ptr = max_node(self.tree.root)?;
        unsafe { Some((&(*min_ptr.as_ptr()).key, &(*max_ptr.as_ptr()).key)) }
    }

    fn len(&self) -> usize {
        BasicTreeMap::len(self)
    }

    fn clear(&mut self) {
        BasicTreeMap::clear(self)
    }

    fn traverse<'a, F: FnMut(&'a K, &'a V)>(&'a self, f: F)
    where
        K: 'a,
        V: 'a,
    {
        self.tree.traverse(f)
    }

    fn into_each<F: FnMut(K, V)>(self, f: F) {
        self.tree.into_each(f)
    }

    fn split(&mut self, key: &K) -> Self {
        BasicTreeMap::split(self, key)
    }

    fn join(&mut self, other: Self) -> Status {
        BasicTreeMap::join(self, other)
    }
}

impl<K: Ord, V> Default for BasicTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Index<&K> for BasicTreeMap<K, V> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K: Ord + Clone, V: Default> IndexMut<&K> for BasicTreeMap<K, V> {
    /// Inserts a default value first if the key is absent.
    fn index_mut(&mut self, key: &K) -> &mut V {
        if self.tree.find(key).is_none() {
            let _ = self.insert(key.clone(), V::default());
        }
        self.get_mut(key).unwrap()
    }
}

#[cfg(any(test, feature = "consistency_check"))]
impl<K: Ord, V> BasicTreeMap<K, V> {
    pub fn check_consistency(&self) {
        self.tree.check_structure();
    }
}

#[cfg(test)]
mod test {
    use super::BasicTreeMap;
    use crate::Status;

    #[test]
    fn test_degenerate_shape_stays_correct() {
        let mut map = BasicTreeMap::new();
        for key in 1..=200 {
            assert_eq!(map.insert(key, key * 10), Status::Success);
        }
        map.check_consistency();
        for key in 1..=200 {
            assert_eq!(map.get(&key), Some(&(key * 10)));
        }
        for key in (1..=200).rev() {
            assert_eq!(map.remove(&key), Status::Success);
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_two_child_remove_promotes_predecessor() {
        let mut map = BasicTreeMap::new();
        for key in [50, 30, 70, 20, 40, 60, 80] {
            let _ = map.insert(key, ());
        }
        assert_eq!(map.remove(&50), Status::Success);
        map.check_consistency();
        assert_eq!(map.len(), 6);
        assert_eq!(map.get(&50), None);
    }

    #[test]
    fn test_split_then_join_restores_entries() {
        let mut map = BasicTreeMap::new();
        for key in 0..50 {
            let _ = map.insert(key, key);
        }
        let right = map.split(&25);
        assert_eq!(map.len(), 25);
        assert_eq!(right.len(), 25);
        assert_eq!(map.join(right), Status::Success);
        assert_eq!(map.len(), 50);
        map.check_consistency();
    }
}
