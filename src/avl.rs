//! An ordered map implemented with a height-balanced binary search tree
//! (AVL tree).

use std::cmp;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

use crate::tree::{
    adjust, adjust_upward, bind_left, bind_right, max_node, min_node, unbind_left, unbind_right,
    Link, Meta, Node, NodePtr, Tree,
};
use crate::{OrderedMap, Status};

pub(crate) struct AvlMeta {
    height: i32,
}

impl Meta for AvlMeta {
    fn leaf() -> Self {
        AvlMeta { height: 1 }
    }

    fn adjust<K, V>(mut node_ptr: NodePtr<K, V, Self>) {
        unsafe {
            node_ptr.as_mut().meta.height = 1 + cmp::max(
                height(node_ptr.as_ref().left),
                height(node_ptr.as_ref().right),
            );
        }
    }
}

fn height<K, V>(link: Link<K, V, AvlMeta>) -> i32 {
    match link {
        None => 0,
        Some(node_ptr) => unsafe { node_ptr.as_ref().meta.height },
    }
}

fn balance_factor<K, V>(node_ptr: NodePtr<K, V, AvlMeta>) -> i32 {
    unsafe { height(node_ptr.as_ref().left) - height(node_ptr.as_ref().right) }
}

/// An ordered map with guaranteed logarithmic height: after every insert
/// and remove the balance factor of each node stays within [-1, 1].
pub struct AvlTreeMap<K: Ord, V> {
    pub(crate) tree: Tree<K, V, AvlMeta>,
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    fn from_root(root: Link<K, V, AvlMeta>) -> Self {
        Self {
            tree: Tree::from_root(root),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Height of the tree; an empty map has height 0.
    pub fn height(&self) -> i32 {
        height(self.tree.root)
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

    /// Inserts a key-value pair. Fails if the key is already present; the
    /// stored value is not overwritten.
    pub fn insert(&mut self, key: K, value: V) -> Status {
        let (parent, mut link_ptr) = self.tree.find_slot(&key);
        unsafe {
            if link_ptr.as_ref().is_some() {
                return Status::Failed;
            }
            *link_ptr.as_mut() = Some(Node::create(parent, key, value));
        }
        self.check_balance(parent);
        Status::Success
    }

    /// Removes the entry with the given key. Fails if the key is absent.
    pub fn remove(&mut self, key: &K) -> Status {
        match self.tree.find(key) {
            None => Status::Failed,
            Some(node_ptr) => {
                let (removed, start) = self.tree.take_out(node_ptr);
                unsafe { Node::destroy(removed) };
                self.check_balance(start);
                Status::Success
            }
        }
    }

    /// Splits the map at `key`: `self` keeps all entries with keys below
    /// `key`, the returned map takes the rest (including `key` itself when
    /// present). Both halves are balanced.
    pub fn split(&mut self, key: &K) -> Self {
        let root = self.tree.root.take();
        let (left, right) = Self::divide(root, key);
        *self = left;
        right
    }

    /// Concatenates two maps with ordered key ranges: the caller guarantees
    /// that every key of `self` is less than every key of `other`.
    pub fn join(&mut self, mut other: Self) -> Status {
        if other.is_empty() {
            return Status::Success;
        }
        if self.is_empty() {
            self.tree.root = other.tree.root.take();
            return Status::Success;
        }
        // Take the pivot from the shorter side to keep the rebalance cheap.
        let mid_ptr = if self.height() >= other.height() {
            other.pop_min()
        } else {
            self.pop_max()
        };
        self.join_at(mid_ptr, other);
        Status::Success
    }

    /// Recursively partitions a detached subtree around `key`, rebuilding
    /// both sides with height-matched joins so they come out balanced.
    fn divide(link: Link<K, V, AvlMeta>, key: &K) -> (Self, Self) {
        let Some(mut node_ptr) = link else {
            return (Self::new(), Self::new());
        };
        unsafe {
            node_ptr.as_mut().parent = None;
            let left_child = unbind_left(node_ptr);
            let right_child = unbind_right(node_ptr);
            if *key <= node_ptr.as_ref().key {
                let (left, mut mid) = Self::divide(left_child, key);
                mid.join_at(node_ptr, Self::from_root(right_child));
                (left, mid)
            } else {
                let (mid, right) = Self::divide(right_child, key);
                let mut left = Self::from_root(left_child);
                left.join_at(node_ptr, mid);
                (left, right)
            }
        }
    }

    /// Concatenates `self`, the detached node `mid` and `other`, where every
    /// key of `self` < `mid.key` < every key of `other`. Descends the taller
    /// side's spine to the height of the shorter side, splices `mid` there
    /// and rebalances upward; O(height difference).
    fn join_at(&mut self, mut mid_ptr: NodePtr<K, V, AvlMeta>, mut other: Self) {
        unsafe {
            if self.height() >= other.height() {
                let limit = other.height() + 1;
                let mut parent: Link<K, V, AvlMeta> = None;
                let mut link_ptr = NonNull::from(&mut self.tree.root);
                while let Some(mut node_ptr) = *link_ptr.as_ref() {
                    if node_ptr.as_ref().meta.height <= limit {
                        break;
                    }
                    parent = Some(node_ptr);
                    link_ptr = NonNull::from(&mut node_ptr.as_mut().right);
                }
                let cut = link_ptr.as_mut().take();
                bind_left(mid_ptr, cut);
                bind_right(mid_ptr, other.tree.root.take());
                *link_ptr.as_mut() = Some(mid_ptr);
                mid_ptr.as_mut().parent = parent;
            } else {
                let limit = self.height() + 1;
                let mut parent: Link<K, V, AvlMeta> = None;
                let mut link_ptr = NonNull::from(&mut other.tree.root);
                while let Some(mut node_ptr) = *link_ptr.as_ref() {
                    if node_ptr.as_ref().meta.height <= limit {
                        break;
                    }
                    parent = Some(node_ptr);
                    link_ptr = NonNull::from(&mut node_ptr.as_mut().left);
                }
                let cut = link_ptr.as_mut().take();
                bind_left(mid_ptr, self.tree.root.take());
                bind_right(mid_ptr, cut);
                *link_ptr.as_mut() = Some(mid_ptr);
                mid_ptr.as_mut().parent = parent;
                self.tree.root = other.tree.root.take();
            }
        }
        self.check_balance(Some(mid_ptr));
    }

    /// Detaches the minimum node and rebalances; the map must be non-empty.
    fn pop_min(&mut self) -> NodePtr<K, V, AvlMeta> {
        let node_ptr = min_node(self.tree.root).unwrap();
        let parent = unsafe { node_ptr.as_ref().parent };
        self.tree.detach(node_ptr);
        self.check_balance(parent);
        node_ptr
    }

    /// Detaches the maximum node and rebalances; the map must be non-empty.
    fn pop_max(&mut self) -> NodePtr<K, V, AvlMeta> {
        let node_ptr = max_node(self.tree.root).unwrap();
        let parent = unsafe { node_ptr.as_ref().parent };
        self.tree.detach(node_ptr);
        self.check_balance(parent);
        node_ptr
    }

    /// Walks from the given position to the root, recomputing metadata and
    /// rotating wherever the balance factor leaves [-1, 1]. Once a rotation
    /// keeps the height its subtree had before, no ancestor can be out of
    /// balance anymore and only sizes still have to propagate.
    fn check_balance(&mut self, start: Link<K, V, AvlMeta>) {
        let mut current = start;
        while let Some(node_ptr) = current {
            adjust(node_ptr);
            let parent = unsafe { node_ptr.as_ref().parent };
            if balance_factor(node_ptr).abs() > 1 {
                let height_kept = self.balance(node_ptr);
                if height_kept {
                    adjust_upward(parent);
                    return;
                }
            }
            current = parent;
        }
    }

    /// Restores balance at a node with factor ±2 by a single or double
    /// rotation. Returns whether the subtree kept its pre-rotation height.
    fn balance(&mut self, node_ptr: NodePtr<K, V, AvlMeta>) -> bool {
        unsafe {
            let prev_height = node_ptr.as_ref().meta.height;
            if balance_factor(node_ptr) > 1 {
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if balance_factor(left_ptr) < 0 {
                    self.tree.rotate_left(left_ptr);
                }
                self.tree.rotate_right(node_ptr);
            } else {
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if balance_factor(right_ptr) > 0 {
                    self.tree.rotate_right(right_ptr);
                }
                self.tree.rotate_left(node_ptr);
            }
            // The rotation promoted the node's new parent into its slot.
            let subtree_ptr = node_ptr.as_ref().parent.unwrap();
            subtree_ptr.as_ref().meta.height == prev_height
        }
    }
}

impl<K: Ord, V> OrderedMap<K, V> for AvlTreeMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Status {
        AvlTreeMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Status {
        AvlTreeMap::remove(self, key)
    }

    fn find(&mut self, key: &K) -> Option<(&K, &V)> {
        self.get_key_value(key)
    }

    fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        AvlTreeMap::find_kth(self, rank)
    }

    fn min(&mut self) -> Option<(&K, &V)> {
        AvlTreeMap::min(self)
    }

    fn max(&mut self) -> Option<(&K, &V)> {
        AvlTreeMap::max(self)
    }

    fn bounds(&mut self) -> Option<(&K, &K)> {
        let min_ptr = min_node(self.tree.root)?;
        let max_ptr = max_node(self.tree.root)?;
        unsafe { Some((&(*min_ptr.as_ptr()).key, &(*max_ptr.as_ptr()).key)) }
    }

    fn len(&self) -> usize {
        AvlTreeMap::len(self)
    }

    fn clear(&mut self) {
        AvlTreeMap::clear(self)
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
        AvlTreeMap::split(self, key)
    }

    fn join(&mut self, other: Self) -> Status {
        AvlTreeMap::join(self, other)
    }
}

impl<K: Ord, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Index<&K> for AvlTreeMap<K, V> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K: Ord + Clone, V: Default> IndexMut<&K> for AvlTreeMap<K, V> {
    /// Inserts a default value first if the key is absent.
    fn index_mut(&mut self, key: &K) -> &mut V {
        if self.tree.find(key).is_none() {
            let _ = self.insert(key.clone(), V::default());
        }
        self.get_mut(key).unwrap()
    }
}

#[cfg(any(test, feature = "consistency_check"))]
impl<K: Ord, V> AvlTreeMap<K, V> {
    pub fn check_consistency(&self) {
        self.tree.check_structure();
        self.tree.check_nodes(|node_ptr| unsafe {
            let expected = 1 + cmp::max(
                height(node_ptr.as_ref().left),
                height(node_ptr.as_ref().right),
            );
            assert_eq!(node_ptr.as_ref().meta.height, expected);
            assert!(balance_factor(node_ptr).abs() <= 1);
        });
    }
}

#[cfg(test)]
mod test {
    use super::AvlTreeMap;
    use crate::Status;

    #[test]
    fn test_single_rotation_on_skewed_insert() {
        // 30                 20
        //   \      =>       /  \
        //    20           10    30
        //   /
        // 10
        let mut map = AvlTreeMap::new();
        assert_eq!(map.insert(30, ()), Status::Success);
        assert_eq!(map.insert(20, ()), Status::Success);
        assert_eq!(map.insert(10, ()), Status::Success);
        assert_eq!(map.height(), 2);
        map.check_consistency();
    }

    #[test]
    fn test_double_rotation_on_zigzag_insert() {
        // 10                 20
        //   \      =>       /  \
        //    30           10    30
        //   /
        // 20
        let mut map = AvlTreeMap::new();
        assert_eq!(map.insert(10, ()), Status::Success);
        assert_eq!(map.insert(30, ()), Status::Success);
        assert_eq!(map.insert(20, ()), Status::Success);
        assert_eq!(map.height(), 2);
        map.check_consistency();
    }

    #[test]
    fn test_remove_rebalances() {
        let mut map = AvlTreeMap::new();
        for key in 1..=64 {
            assert_eq!(map.insert(key, key), Status::Success);
        }
        for key in (1..=64).step_by(2) {
            assert_eq!(map.remove(&key), Status::Success);
            map.check_consistency();
        }
        assert_eq!(map.len(), 32);
    }

    #[test]
    fn test_split_empty_and_extremes() {
        let mut map: AvlTreeMap<i32, i32> = AvlTreeMap::new();
        let right = map.split(&5);
        assert!(map.is_empty() && right.is_empty());

        for key in 1..=10 {
            let _ = map.insert(key, key);
        }
        let right = map.split(&1);
        assert!(map.is_empty());
        assert_eq!(right.len(), 10);
        right.check_consistency();

        let mut map = right;
        let right = map.split(&11);
        assert!(right.is_empty());
        assert_eq!(map.len(), 10);
        map.check_consistency();
    }

    #[test]
    fn test_join_uneven_heights() {
        let mut left = AvlTreeMap::new();
        for key in 1..=100 {
            let _ = left.insert(key, key);
        }
        let mut right = AvlTreeMap::new();
        for key in 101..=104 {
            let _ = right.insert(key, key);
        }
        assert_eq!(left.join(right), Status::Success);
        assert_eq!(left.len(), 104);
        left.check_consistency();
        for key in 1..=104 {
            assert_eq!(left.get(&key), Some(&key));
        }
    }
}
