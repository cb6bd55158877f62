//! Shared structural core for all tree variants.
//!
//! Nodes own their children through raw `NonNull` links and carry a
//! non-owning parent back-pointer that is used only for upward maintenance
//! walks and rotation bookkeeping. Every structural mutation goes through
//! the primitives in this module, which keep parent pointers and subtree
//! metadata consistent. All `unsafe` code of the crate lives here and in
//! the variant balancing code; the public map types expose a safe API.

use std::cmp::Ordering;
use std::ptr::NonNull;

pub(crate) type NodePtr<K, V, M> = NonNull<Node<K, V, M>>;
pub(crate) type Link<K, V, M> = Option<NodePtr<K, V, M>>;
pub(crate) type LinkPtr<K, V, M> = NonNull<Link<K, V, M>>;

/// Per-variant node metadata, recomputed from already-correct children.
///
/// Subtree sizes are maintained unconditionally; a variant only adds what
/// its balancing strategy needs (height for AVL, priority for the treap).
pub(crate) trait Meta: Sized {
    /// Metadata for a freshly created leaf.
    fn leaf() -> Self;

    /// Recomputes this node's metadata. Both children are consistent when
    /// this is called.
    fn adjust<K, V>(node_ptr: NodePtr<K, V, Self>);
}

impl Meta for () {
    fn leaf() -> Self {}
    fn adjust<K, V>(_: NodePtr<K, V, Self>) {}
}

pub(crate) struct Node<K, V, M> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V, M>,
    pub(crate) right: Link<K, V, M>,
    pub(crate) parent: Link<K, V, M>,
    pub(crate) size: usize,
    pub(crate) meta: M,
}

impl<K, V, M: Meta> Node<K, V, M> {
    pub(crate) fn create(parent: Link<K, V, M>, key: K, value: V) -> NodePtr<K, V, M> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            size: 1,
            meta: M::leaf(),
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }
}

impl<K, V, M> Node<K, V, M> {
    pub(crate) unsafe fn destroy(node_ptr: NodePtr<K, V, M>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    pub(crate) unsafe fn into_entry(node_ptr: NodePtr<K, V, M>) -> (K, V) {
        let boxed = Box::from_raw(node_ptr.as_ptr());
        (boxed.key, boxed.value)
    }
}

pub(crate) fn subtree_size<K, V, M>(link: Link<K, V, M>) -> usize {
    match link {
        None => 0,
        Some(node_ptr) => unsafe { node_ptr.as_ref().size },
    }
}

/// Recomputes size and variant metadata of a single node from its children.
pub(crate) fn adjust<K, V, M: Meta>(mut node_ptr: NodePtr<K, V, M>) {
    unsafe {
        node_ptr.as_mut().size =
            1 + subtree_size(node_ptr.as_ref().left) + subtree_size(node_ptr.as_ref().right);
    }
    M::adjust(node_ptr);
}

/// Maintenance walk: recomputes metadata from the given position up to the
/// root. Called after any structural change deeper in the tree.
pub(crate) fn adjust_upward<K, V, M: Meta>(start: Link<K, V, M>) {
    let mut current = start;
    while let Some(node_ptr) = current {
        adjust(node_ptr);
        current = unsafe { node_ptr.as_ref().parent };
    }
}

/// Attaches a subtree as the left child, fixing its parent pointer.
pub(crate) fn bind_left<K, V, M>(mut node_ptr: NodePtr<K, V, M>, child: Link<K, V, M>) {
    unsafe {
        node_ptr.as_mut().left = child;
        if let Some(mut child_ptr) = child {
            child_ptr.as_mut().parent = Some(node_ptr);
        }
    }
}

/// Attaches a subtree as the right child, fixing its parent pointer.
pub(crate) fn bind_right<K, V, M>(mut node_ptr: NodePtr<K, V, M>, child: Link<K, V, M>) {
    unsafe {
        node_ptr.as_mut().right = child;
        if let Some(mut child_ptr) = child {
            child_ptr.as_mut().parent = Some(node_ptr);
        }
    }
}

/// Releases the left child, clearing its parent pointer and recomputing the
/// node's metadata. Returns the detached subtree.
pub(crate) fn unbind_left<K, V, M: Meta>(mut node_ptr: NodePtr<K, V, M>) -> Link<K, V, M> {
    let child = unsafe { node_ptr.as_mut().left.take() };
    if let Some(mut child_ptr) = child {
        unsafe { child_ptr.as_mut().parent = None };
    }
    adjust(node_ptr);
    child
}

/// Releases the right child; see [`unbind_left`].
pub(crate) fn unbind_right<K, V, M: Meta>(mut node_ptr: NodePtr<K, V, M>) -> Link<K, V, M> {
    let child = unsafe { node_ptr.as_mut().right.take() };
    if let Some(mut child_ptr) = child {
        unsafe { child_ptr.as_mut().parent = None };
    }
    adjust(node_ptr);
    child
}

pub(crate) fn min_node<K, V, M>(link: Link<K, V, M>) -> Link<K, V, M> {
    let mut current = link;
    while let Some(node_ptr) = current {
        match unsafe { node_ptr.as_ref().left } {
            None => break,
            left => current = left,
        }
    }
    current
}

pub(crate) fn max_node<K, V, M>(link: Link<K, V, M>) -> Link<K, V, M> {
    let mut current = link;
    while let Some(node_ptr) = current {
        match unsafe { node_ptr.as_ref().right } {
            None => break,
            right => current = right,
        }
    }
    current
}

/// In-order successor via parent pointers.
pub(crate) fn successor<K, V, M>(node_ptr: NodePtr<K, V, M>) -> Link<K, V, M> {
    unsafe {
        if node_ptr.as_ref().right.is_some() {
            return min_node(node_ptr.as_ref().right);
        }
        let mut current = node_ptr;
        while let Some(parent_ptr) = current.as_ref().parent {
            if parent_ptr.as_ref().left == Some(current) {
                return Some(parent_ptr);
            }
            current = parent_ptr;
        }
        None
    }
}

/// Owns at most one root node; the map variants wrap this and add their
/// balancing strategy on top.
pub(crate) struct Tree<K, V, M> {
    pub(crate) root: Link<K, V, M>,
}

impl<K, V, M> Tree<K, V, M> {
    pub(crate) fn new() -> Self {
        Self { root: None }
    }

    /// Adopts a detached subtree as the root, clearing its parent pointer.
    pub(crate) fn from_root(root: Link<K, V, M>) -> Self {
        if let Some(mut root_ptr) = root {
            unsafe { root_ptr.as_mut().parent = None };
        }
        Self { root }
    }

    pub(crate) fn len(&self) -> usize {
        subtree_size(self.root)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Owning slot of a node: the root slot, or the matching child slot of
    /// the node's parent.
    pub(crate) fn slot_of(&mut self, node_ptr: NodePtr<K, V, M>) -> LinkPtr<K, V, M> {
        unsafe {
            match node_ptr.as_ref().parent {
                None => NonNull::from(&mut self.root),
                Some(mut parent_ptr) => {
                    if parent_ptr.as_ref().left == Some(node_ptr) {
                        NonNull::from(&mut parent_ptr.as_mut().left)
                    } else {
                        NonNull::from(&mut parent_ptr.as_mut().right)
                    }
                }
            }
        }
    }

    /// Node with the given rank in key order (1-based). The subtree sizes
    /// steer the descent: a rank within the left subtree goes left, a rank
    /// past it goes right with the left count spent.
    pub(crate) fn find_kth(&self, rank: usize) -> Link<K, V, M> {
        if rank == 0 || rank > self.len() {
            return None;
        }
        let mut remaining = rank;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let left = unsafe { node_ptr.as_ref().left };
            let left_size = subtree_size(left);
            if remaining <= left_size {
                current = left;
            } else if remaining == left_size + 1 {
                return Some(node_ptr);
            } else {
                remaining -= left_size + 1;
                current = unsafe { node_ptr.as_ref().right };
            }
        }
        None
    }

    /// In-order visit of all entries. Walks successor links, so no
    /// recursion and no allocation.
    pub(crate) fn traverse<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a K, &'a V),
    {
        let mut current = min_node(self.root);
        while let Some(node_ptr) = current {
            let node = unsafe { &*node_ptr.as_ptr() };
            f(&node.key, &node.value);
            current = successor(node_ptr);
        }
    }

    /// In-order consuming visit. Uses an explicit stack so that a degenerate
    /// shape cannot exhaust the call stack.
    pub(crate) fn into_each<F: FnMut(K, V)>(mut self, mut f: F) {
        let mut stack: Vec<NodePtr<K, V, M>> = Vec::new();
        let mut current = self.root.take();
        while current.is_some() || !stack.is_empty() {
            while let Some(node_ptr) = current {
                stack.push(node_ptr);
                current = unsafe { node_ptr.as_ref().left };
            }
            if let Some(node_ptr) = stack.pop() {
                unsafe {
                    current = node_ptr.as_ref().right;
                    let (key, value) = Node::into_entry(node_ptr);
                    f(key, value);
                }
            }
        }
    }

    /// Destroys all nodes. Iterative for the same reason as
    /// [`Tree::into_each`]: splay and basic trees can be skewed enough that
    /// recursive teardown overflows the stack.
    pub(crate) fn clear(&mut self) {
        let mut stack: Vec<NodePtr<K, V, M>> = Vec::new();
        if let Some(root_ptr) = self.root.take() {
            stack.push(root_ptr);
        }
        while let Some(node_ptr) = stack.pop() {
            unsafe {
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    stack.push(left_ptr);
                }
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    stack.push(right_ptr);
                }
                Node::destroy(node_ptr);
            }
        }
    }
}

impl<K: Ord, V, M> Tree<K, V, M> {
    pub(crate) fn find(&self, key: &K) -> Link<K, V, M> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    /// Walks toward `key` and returns the slot it occupies or would occupy,
    /// together with that slot's logical parent.
    pub(crate) fn find_slot(&mut self, key: &K) -> (Link<K, V, M>, LinkPtr<K, V, M>) {
        let mut parent: Link<K, V, M> = None;
        let mut link_ptr: LinkPtr<K, V, M> = NonNull::from(&mut self.root);
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => break,
                    Ordering::Less => {
                        parent = Some(node_ptr);
                        link_ptr = NonNull::from(&mut node_ptr.as_mut().left);
                    }
                    Ordering::Greater => {
                        parent = Some(node_ptr);
                        link_ptr = NonNull::from(&mut node_ptr.as_mut().right);
                    }
                }
            }
        }
        (parent, link_ptr)
    }
}

impl<K, V, M: Meta> Tree<K, V, M> {
    pub(crate) fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V, M>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                adjust(node_ptr);
                adjust(right_ptr);
            }
        }
    }

    pub(crate) fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V, M>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                adjust(node_ptr);
                adjust(left_ptr);
            }
        }
    }

    /// Unlinks a node with at most one child, splicing that child into the
    /// node's slot and recomputing metadata upward from the former parent.
    /// The returned node is owned by the caller.
    pub(crate) fn detach(&mut self, mut node_ptr: NodePtr<K, V, M>) -> NodePtr<K, V, M> {
        unsafe {
            debug_assert!(node_ptr.as_ref().left.is_none() || node_ptr.as_ref().right.is_none());
            let parent = node_ptr.as_ref().parent;
            let child = node_ptr
                .as_mut()
                .left
                .take()
                .or_else(|| node_ptr.as_mut().right.take());
            let mut slot = self.slot_of(node_ptr);
            *slot.as_mut() = child;
            if let Some(mut child_ptr) = child {
                child_ptr.as_mut().parent = parent;
            }
            node_ptr.as_mut().parent = None;
            adjust_upward(parent);
            node_ptr
        }
    }

    /// Shared removal shape: a node with at most one child is detached
    /// directly; a node with two children trades places with its in-order
    /// predecessor (maximum of the left subtree), which inherits both
    /// children and the vacated slot. Subtree sizes are consistent on
    /// return. Returns the unlinked node and the position the variant
    /// re-balances from.
    pub(crate) fn take_out(
        &mut self,
        mut node_ptr: NodePtr<K, V, M>,
    ) -> (NodePtr<K, V, M>, Link<K, V, M>) {
        unsafe {
            if node_ptr.as_ref().left.is_none() || node_ptr.as_ref().right.is_none() {
                let parent = node_ptr.as_ref().parent;
                self.detach(node_ptr);
                return (node_ptr, parent);
            }

            let mut pred_ptr = max_node(node_ptr.as_ref().left).unwrap();
            let pred_parent = pred_ptr.as_ref().parent;
            self.detach(pred_ptr);

            bind_left(pred_ptr, node_ptr.as_mut().left.take());
            bind_right(pred_ptr, node_ptr.as_mut().right.take());
            let parent = node_ptr.as_ref().parent;
            let mut slot = self.slot_of(node_ptr);
            *slot.as_mut() = Some(pred_ptr);
            pred_ptr.as_mut().parent = parent;
            node_ptr.as_mut().parent = None;
            adjust(pred_ptr);

            let start = if pred_parent == Some(node_ptr) {
                Some(pred_ptr)
            } else {
                pred_parent
            };
            (node_ptr, start)
        }
    }
}

impl<K, V, M> Drop for Tree<K, V, M> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(any(test, feature = "consistency_check"))]
impl<K: Ord, V, M> Tree<K, V, M> {
    /// Checks BST order, parent back-references and subtree sizes.
    pub(crate) fn check_structure(&self) {
        unsafe {
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }

            let mut stack = Vec::new();
            if let Some(root_ptr) = self.root {
                stack.push(root_ptr);
            }
            while let Some(node_ptr) = stack.pop() {
                let node = node_ptr.as_ref();
                let mut size = 1;
                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                    size += left_ptr.as_ref().size;
                    stack.push(left_ptr);
                }
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                    size += right_ptr.as_ref().size;
                    stack.push(right_ptr);
                }
                assert_eq!(node.size, size);
            }
        }

        // In-order keys must be strictly increasing.
        let mut prev: Option<&K> = None;
        self.traverse(|key, _| {
            if let Some(prev_key) = prev {
                assert!(prev_key < key);
            }
            prev = Some(key);
        });
    }

    /// Runs a closure over every node, preorder.
    pub(crate) fn check_nodes<F: FnMut(NodePtr<K, V, M>)>(&self, mut f: F) {
        let mut stack = Vec::new();
        if let Some(root_ptr) = self.root {
            stack.push(root_ptr);
        }
        while let Some(node_ptr) = stack.pop() {
            f(node_ptr);
            unsafe {
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    stack.push(left_ptr);
                }
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    stack.push(right_ptr);
                }
            }
        }
    }
}
