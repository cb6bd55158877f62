//! An ordered map implemented with a treap: a binary search tree on keys
//! that is simultaneously a max-heap on random per-node priorities, which
//! keeps the expected height logarithmic.

use std::cmp::Ordering;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

use crate::tree::{
    adjust, adjust_upward, max_node, min_node, Link, Meta, Node, NodePtr, Tree,
};
use crate::{OrderedMap, Status};

pub(crate) struct TreapMeta {
    priority: i32,
}

impl Meta for TreapMeta {
    fn leaf() -> Self {
        TreapMeta {
            priority: rand::random(),
        }
    }

    fn adjust<K, V>(_: NodePtr<K, V, Self>) {}
}

fn priority<K, V>(node_ptr: NodePtr<K, V, TreapMeta>) -> i32 {
    unsafe { node_ptr.as_ref().meta.priority }
}

/// Three-way split of a detached subtree around `key`. Walks the search
/// path once, hanging the off-path subtrees onto the growing left and right
/// parts through link hooks, then repairs metadata along both seams. No
/// recursion, so an adversarial shape cannot overflow the stack.
fn split_parts<K: Ord, V>(
    root: Link<K, V, TreapMeta>,
    key: &K,
) -> (
    Link<K, V, TreapMeta>,
    Link<K, V, TreapMeta>,
    Link<K, V, TreapMeta>,
) {
    let mut left: Link<K, V, TreapMeta> = None;
    let mut mid: Link<K, V, TreapMeta> = None;
    let mut right: Link<K, V, TreapMeta> = None;
    unsafe {
        let mut left_hook = NonNull::from(&mut left);
        let mut right_hook = NonNull::from(&mut right);
        // Deepest node attached to each part so far.
        let mut left_seam: Link<K, V, TreapMeta> = None;
        let mut right_seam: Link<K, V, TreapMeta> = None;
        if let Some(mut root_ptr) = root {
            root_ptr.as_mut().parent = None;
        }
        let mut current = root;
        while let Some(mut node_ptr) = current {
            match key.cmp(&node_ptr.as_ref().key) {
                Ordering::Equal => {
                    let node_left = node_ptr.as_mut().left.take();
                    let node_right = node_ptr.as_mut().right.take();
                    *left_hook.as_mut() = node_left;
                    if let Some(mut child_ptr) = node_left {
                        child_ptr.as_mut().parent = left_seam;
                    }
                    *right_hook.as_mut() = node_right;
                    if let Some(mut child_ptr) = node_right {
                        child_ptr.as_mut().parent = right_seam;
                    }
                    node_ptr.as_mut().parent = None;
                    adjust(node_ptr);
                    mid = Some(node_ptr);
                    current = None;
                }
                Ordering::Greater => {
                    // The node and its left subtree stay below the key.
                    let next = node_ptr.as_mut().right.take();
                    *left_hook.as_mut() = Some(node_ptr);
                    node_ptr.as_mut().parent = left_seam;
                    left_seam = Some(node_ptr);
                    left_hook = NonNull::from(&mut node_ptr.as_mut().right);
                    current = next;
                }
                Ordering::Less => {
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
    (left, mid, right)
}

/// Priority-directed concatenation of two detached subtrees; every key of
/// `left` is below every key of `right`. The root with the higher priority
/// wins each step (ties go to the left), so the heap property carries over.
fn join_parts<K: Ord, V>(
    left: Link<K, V, TreapMeta>,
    right: Link<K, V, TreapMeta>,
) -> Link<K, V, TreapMeta> {
    let mut root: Link<K, V, TreapMeta> = None;
    unsafe {
        let mut hook = NonNull::from(&mut root);
        let mut seam: Link<K, V, TreapMeta> = None;
        let mut lhs = left;
        let mut rhs = right;
        if let Some(mut node_ptr) = lhs {
            node_ptr.as_mut().parent = None;
        }
        if let Some(mut node_ptr) = rhs {
            node_ptr.as_mut().parent = None;
        }
        loop {
            let (Some(mut left_ptr), Some(mut right_ptr)) = (lhs, rhs) else {
                let rest = lhs.or(rhs);
                *hook.as_mut() = rest;
                if let Some(mut rest_ptr) = rest {
                    rest_ptr.as_mut().parent = seam;
                }
                break;
            };
            if priority(left_ptr) >= priority(right_ptr) {
                let next = left_ptr.as_mut().right.take();
                *hook.as_mut() = Some(left_ptr);
                left_ptr.as_mut().parent = seam;
                seam = Some(left_ptr);
                hook = NonNull::from(&mut left_ptr.as_mut().right);
                lhs = next;
            } else {
                let next = right_ptr.as_mut().left.take();
                *hook.as_mut() = Some(right_ptr);
                right_ptr.as_mut().parent = seam;
                seam = Some(right_ptr);
                hook = NonNull::from(&mut right_ptr.as_mut().left);
                rhs = next;
            }
        }
        adjust_upward(seam);
    }
    root
}

/// An ordered map with expected logarithmic height under any insertion
/// order, at the cost of randomized rather than guaranteed bounds.
pub struct TreapMap<K: Ord, V> {
    pub(crate) tree: Tree<K, V, TreapMeta>,
}

impl<K: Ord, V> TreapMap<K, V> {
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

    /// Inserts as a leaf, then rotates the new node up while its random
    /// priority beats its parent's. Fails if the key is already present.
    pub fn insert(&mut self, key: K, value: V) -> Status {
        let (parent, mut link_ptr) = self.tree.find_slot(&key);
        unsafe {
            if link_ptr.as_ref().is_some() {
                return Status::Failed;
            }
            let node_ptr = Node::create(parent, key, value);
            *link_ptr.as_mut() = Some(node_ptr);
            adjust_upward(parent);
            while let Some(parent_ptr) = node_ptr.as_ref().parent {
                if priority(node_ptr) <= priority(parent_ptr) {
                    break;
                }
                if parent_ptr.as_ref().left == Some(node_ptr) {
                    self.tree.rotate_right(parent_ptr);
                } else {
                    self.tree.rotate_left(parent_ptr);
                }
            }
        }
        Status::Success
    }

    /// Removes by splitting the key out three ways and joining the outer
    /// parts back together. Fails if the key is absent.
    pub fn remove(&mut self, key: &K) -> Status {
        let (left, mid, right) = split_parts(self.tree.root.take(), key);
        self.tree.root = join_parts(left, right);
        match mid {
            Some(node_ptr) => {
                unsafe { Node::destroy(node_ptr) };
                Status::Success
            }
            None => Status::Failed,
        }
    }

    /// Splits the map at `key`: `self` keeps all entries with keys below
    /// `key`, the returned map takes the rest (including `key` itself when
    /// present).
    pub fn split(&mut self, key: &K) -> Self {
        let (left, mid, right) = split_parts(self.tree.root.take(), key);
        self.tree.root = left;
        Self {
            tree: Tree::from_root(join_parts(mid, right)),
        }
    }

    /// Concatenates two maps with ordered key ranges: the caller guarantees
    /// that every key of `self` is less than every key of `other`.
    pub fn join(&mut self, mut other: Self) -> Status {
        self.tree.root = join_parts(self.tree.root.take(), other.tree.root.take());
        Status::Success
    }
}

impl<K: Ord, V> OrderedMap<K, V> for TreapMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Status {
        TreapMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Status {
        TreapMap::remove(self, key)
    }

    fn find(&mut self, key: &K) -> Option<(&K, &V)> {
        self.get_key_value(key)
    }

    fn find_kth(&self, rank: usize) -> Option<(&K, &V)> {
        TreapMap::find_kth(self, rank)
    }

    fn min(&mut self) -> Option<(&K, &V)> {
        TreapMap::min(self)
    }

    fn max(&mut self) -> Option<(&K, &V)> {
        TreapMap::max(self)
    }

    fn bounds(&mut self) -> Option<(&K, &K)> {
        let min_ptr = min_node(self.tree.root)?;
        let max_ptr = max_node(self.tree.root)?;
        unsafe { Some((&(*min_ptr.as_ptr()).key, &(*max_ptr.as_ptr()).key)) }
    }

    fn len(&self) -> usize {
        TreapMap::len(self)
    }

    fn clear(&mut self) {
        TreapMap::clear(self)
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
        TreapMap::split(self, key)
    }

    fn join(&mut self, other: Self) -> Status {
        TreapMap::join(self, other)
    }
}

impl<K: Ord, V> Default for TreapMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Index<&K> for TreapMap<K, V> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K: Ord + Clone, V: Default> IndexMut<&K> for TreapMap<K, V> {
    /// Inserts a default value first if the key is absent.
    fn index_mut(&mut self, key: &K) -> &mut V {
        if self.tree.find(key).is_none() {
            let _ = self.insert(key.clone(), V::default());
        }
        self.get_mut(key).unwrap()
    }
}

#[cfg(any(test, feature = "consistency_check"))]
impl<K: Ord, V> TreapMap<K, V> {
    pub fn check_consistency(&self) {
        self.tree.check_structure();
        self.tree.check_nodes(|node_ptr| unsafe {
            if let Some(left_ptr) = node_ptr.as_ref().left {
                assert!(priority(node_ptr) >= priority(left_ptr));
            }
            if let Some(right_ptr) = node_ptr.as_ref().right {
                assert!(priority(node_ptr) >= priority(right_ptr));
            }
        });
    }
}
