//! An ordered map implemented with a splay tree: every keyed access moves
//! the touched node to the root, so recently used entries are cheap to
//! reach again. Keyed reads restructure the tree and therefore take
//! `&mut self`.

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

use crate::tree::{
    adjust, bind_right, max_node, min_node, unbind_left, unbind_right, Link, Node, NodePtr, Tree,
};
use crate::{OrderedMap, Status};

/// A self-adjusting ordered map with amortized logarithmic access cost and
/// no per-node bookkeeping beyond the subtree size.
pub struct SplayTreeMap<K: Ord, V> {
    pub(crate) tree: Tree<K, V, ()>,
}

impl<K: Ord, V> SplayTreeMap<K, V> {
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

    /// Looks the key up and splays the node to the root on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.find_splay(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find_splay(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    pub fn get_key_value(&mut self, key: &K) -> Option<(&K, &V)> {
        self.find_splay(key).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Entry with the given rank in key order (1-based); `None` when the
    /// rank is 0 or past the end. Unlike keyed reads this does not splay.
    pub fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        self.tree.find_kth(rank).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Minimum entry, splayed to the root.
    pub fn min(&mut self) -> Option<(&K, &V)> {
        let node_ptr = min_node(self.tree.root)?;
        self.splay(node_ptr);
        unsafe {
            let node = &*node_ptr.as_ptr();
            Some((&node.key, &node.value))
        }
    }

    /// Maximum entry, splayed to the root.
    pub fn max(&mut self) -> Option<(&K, &V)> {
        let node_ptr = max_node(self.tree.root)?;
        self.splay(node_ptr);
        unsafe {
            let node = &*node_ptr.as_ptr();
            Some((&node.key, &node.value))
        }
    }

    /// Inserts a key-value pair and splays the new node to the root. Fails
    /// if the key is already present.
    pub fn insert(&mut self, key: K, value: V) -> Status {
        let (parent, mut link_ptr) = self.tree.find_slot(&key);
        unsafe {
            if link_ptr.as_ref().is_some() {
                return Status::Failed;
            }
            let node_ptr = Node::create(parent, key, value);
            *link_ptr.as_mut() = Some(node_ptr);
            self.splay(node_ptr);
        }
        Status::Success
    }

    /// Splays the node out, drops it and rejoins the two halves. Fails if
    /// the key is absent.
    pub fn remove(&mut self, key: &K) -> Status {
        if self.find_splay(key).is_none() {
            return Status::Failed;
        }
        // The hit is at the root now.
        let root_ptr = self.tree.root.take().unwrap();
        let left = unbind_left(root_ptr);
        let right = unbind_right(root_ptr);
        unsafe { Node::destroy(root_ptr) };
        self.tree.root = left;
        self.join_root(right);
        Status::Success
    }

    /// Splits the map at `key`: `self` keeps all entries with keys below
    /// `key`, the returned map takes the rest (including `key` itself when
    /// present). Splays the boundary node first, then cuts at the root.
    pub fn split(&mut self, key: &K) -> Self {
        let _ = self.find_splay(key);
        let Some(root_ptr) = self.tree.root else {
            return Self::new();
        };
        unsafe {
            if *key <= root_ptr.as_ref().key {
                // The root belongs to the split-off upper part.
                let root_ptr = self.tree.root.take().unwrap();
                self.tree.root = unbind_left(root_ptr);
                Self {
                    tree: Tree::from_root(Some(root_ptr)),
                }
            } else {
                Self {
                    tree: Tree::from_root(unbind_right(root_ptr)),
                }
            }
        }
    }

    /// Concatenates two maps with ordered key ranges: the caller guarantees
    /// that every key of `self` is less than every key of `other`.
    pub fn join(&mut self, mut other: Self) -> Status {
        self.join_root(other.tree.root.take());
        Status::Success
    }

    /// Hangs a detached tree with larger keys below this tree's maximum,
    /// which is splayed to the root first so its right slot is free.
    fn join_root(&mut self, right: Link<K, V, ()>) {
        if self.tree.root.is_none() {
            self.tree.root = right;
            return;
        }
        if right.is_none() {
            return;
        }
        let max_ptr = max_node(self.tree.root).unwrap();
        self.splay(max_ptr);
        bind_right(max_ptr, right);
        adjust(max_ptr);
    }

    /// Walks toward `key` and splays the node found, or the last node
    /// visited when the key is absent, which keeps repeated misses cheap.
    fn find_splay(&mut self, key: &K) -> Option<NodePtr<K, V, ()>> {
        let mut current = self.tree.root;
        let mut last = None;
        let mut found = None;
        while let Some(node_ptr) = current {
            last = Some(node_ptr);
            current = unsafe {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => {
                        found = Some(node_ptr);
                        None
                    }
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            };
        }
        if let Some(node_ptr) = found.or(last) {
            self.splay(node_ptr);
        }
        found
    }

    /// Moves a node to the root with zig, zig-zig and zig-zag steps. On a
    /// zig-zig the grandparent-level rotation goes first, which is what
    /// gives splay trees their amortized bound.
    fn splay(&mut self, node_ptr: NodePtr<K, V, ()>) {
        unsafe {
            while let Some(parent_ptr) = node_ptr.as_ref().parent {
                if let Some(grandparent_ptr) = parent_ptr.as_ref().parent {
                    let node_is_left = parent_ptr.as_ref().left == Some(node_ptr);
                    let parent_is_left = grandparent_ptr.as_ref().left == Some(parent_ptr);
                    if node_is_left == parent_is_left {
                        self.rotate_up(parent_ptr);
                    } else {
                        self.rotate_up(node_ptr);
                    }
                }
                self.rotate_up(node_ptr);
            }
        }
    }

    /// Rotates a node above its parent; no-op at the root.
    fn rotate_up(&mut self, node_ptr: NodePtr<K, V, ()>) {
        unsafe {
            if let Some(parent_ptr) = node_ptr.as_ref().parent {
                if parent_ptr.as_ref().left == Some(node_ptr) {
                    self.tree.rotate_right(parent_ptr);
                } else {
                    self.tree.rotate_left(parent_ptr);
                }
            }
        }
    }
}

impl<K: Ord, V> OrderedMap<K, V> for SplayTreeMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Status {
        SplayTreeMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Status {
        SplayTreeMap::remove(self, key)
    }

    fn find(&mut self, key: &K) -> Option<(&K, &V)> {
        self.get_key_value(key)
    }

    fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        SplayTreeMap::find_kth(self, rank)
    }

    fn min(&mut self) -> Option<(&K, &V)> {
        SplayTreeMap::min(self)
    }

    fn max(&mut self) -> Option<(&K, &V)> {
        SplayTreeMap::max(self)
    }

    fn bounds(&mut self) -> Option<(&K, &K)> {
        let min_ptr = min_node(self.tree.root)?;
        self.splay(min_ptr);
        let max_ptr = max_node(self.tree.root)?;
        self.splay(max_ptr);
        unsafe { Some((&(*min_ptr.as_ptr()).key, &(*max_ptr.as_ptr()).key)) }
    }

    fn len(&self) -> usize {
        SplayTreeMap::len(self)
    }

    fn clear(&mut self) {
        SplayTreeMap::clear(self)
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
        SplayTreeMap::split(self, key)
    }

    fn join(&mut self, other: Self) -> Status {
        SplayTreeMap::join(self, other)
    }
}

impl<K: Ord, V> Default for SplayTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Index<&K> for SplayTreeMap<K, V> {
    type Output = V;

    /// Read-only lookup that does not restructure the tree; use
    /// [`SplayTreeMap::get`] for splaying access.
    fn index(&self, key: &K) -> &V {
        self.tree
            .find(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
            .expect("key not found")
    }
}

impl<K: Ord + Clone, V: Default> IndexMut<&K> for SplayTreeMap<K, V> {
    /// Inserts a default value first if the key is absent.
    fn index_mut(&mut self, key: &K) -> &mut V {
        if self.tree.find(key).is_none() {
            let _ = self.insert(key.clone(), V::default());
        }
        self.get_mut(key).unwrap()
    }
}

#[cfg(any(test, feature = "consistency_check"))]
impl<K: Ord, V> SplayTreeMap<K, V> {
    pub fn check_consistency(&self) {
        self.tree.check_structure();
    }
}

#[cfg(test)]
mod test {
    use super::SplayTreeMap;
    use crate::Status;

    fn root_key(map: &SplayTreeMap<i32, i32>) -> Option<i32> {
        map.tree.root.map(|node_ptr| unsafe { node_ptr.as_ref().key })
    }

    #[test]
    fn test_access_moves_node_to_root() {
        let mut map = SplayTreeMap::new();
        for key in 1..=10 {
            assert_eq!(map.insert(key, key), Status::Success);
        }
        assert_eq!(root_key(&map), Some(10));
        assert_eq!(map.get(&3), Some(&3));
        assert_eq!(root_key(&map), Some(3));
        map.check_consistency();
    }

    #[test]
    fn test_miss_splays_last_visited() {
        let mut map = SplayTreeMap::new();
        for key in [5, 2, 8] {
            let _ = map.insert(key, key);
        }
        assert_eq!(map.get(&9), None);
        // The search for 9 ends at 8.
        assert_eq!(root_key(&map), Some(8));
        map.check_consistency();
    }

    #[test]
    fn test_remove_joins_halves() {
        let mut map = SplayTreeMap::new();
        for key in 1..=20 {
            let _ = map.insert(key, key);
        }
        for key in [10, 1, 20, 15] {
            assert_eq!(map.remove(&key), Status::Success);
            map.check_consistency();
        }
        assert_eq!(map.len(), 16);
        assert_eq!(map.remove(&10), Status::Failed);
    }

    #[test]
    fn test_split_at_absent_key_cuts_by_order() {
        let mut map = SplayTreeMap::new();
        for key in (0..20).step_by(2) {
            let _ = map.insert(key, key);
        }
        let mut right = map.split(&9);
        assert_eq!(map.len(), 5);
        assert_eq!(right.len(), 5);
        assert_eq!(map.max().map(|(k, _)| *k), Some(8));
        assert_eq!(right.min().map(|(k, _)| *k), Some(10));
        map.check_consistency();
        right.check_consistency();
    }

    #[test]
    fn test_split_miss_above_boundary() {
        let mut map = SplayTreeMap::new();
        for key in (0..100).step_by(20) {
            let _ = map.insert(key, key);
        }
        // Root the smallest key so the search for 15 ends at 20, above
        // the split key.
        assert_eq!(map.get(&0), Some(&0));
        let mut upper = map.split(&15);
        assert_eq!(map.len(), 1);
        assert_eq!(upper.len(), 4);
        assert_eq!(map.max().map(|(k, _)| *k), Some(0));
        assert_eq!(upper.min().map(|(k, _)| *k), Some(20));
        map.check_consistency();
        upper.check_consistency();
    }
}
