//! Read-only structural snapshots, for rendering or asserting on tree
//! shape without reaching into the node internals. Views are output-only:
//! nothing built here feeds back into the trees.

use std::fmt::Display;

use crate::tree::Tree;
use crate::{AvlTreeMap, BasicTreeMap, SplayTreeMap, TreapMap};

/// Shape record of a single node. The id is an opaque identifier that is
/// stable within one snapshot; children are referenced by id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeView {
    pub id: usize,
    pub key: String,
    pub value: String,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// Immutable snapshot of one tree's shape.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TreeView {
    pub root: Option<usize>,
    pub nodes: Vec<NodeView>,
}

impl TreeView {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node record for an id, if the id belongs to this snapshot.
    pub fn node(&self, id: usize) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Root node record, if the tree is non-empty.
    pub fn root_node(&self) -> Option<&NodeView> {
        self.root.and_then(|id| self.node(id))
    }
}

/// A sequence of snapshots, such as the before/after pair recorded by
/// [`trace`].
pub type ForestView = Vec<TreeView>;

/// Maps that can produce a structural snapshot of themselves.
pub trait Viewable {
    fn view(&self) -> TreeView;
}

fn snapshot<K: Display, V: Display, M>(tree: &Tree<K, V, M>) -> TreeView {
    let mut nodes = Vec::with_capacity(tree.len());
    let mut stack = Vec::new();
    if let Some(root_ptr) = tree.root {
        stack.push(root_ptr);
    }
    while let Some(node_ptr) = stack.pop() {
        let node = unsafe { &*node_ptr.as_ptr() };
        nodes.push(NodeView {
            id: node_ptr.as_ptr() as usize,
            key: node.key.to_string(),
            value: node.value.to_string(),
            left: node.left.map(|child_ptr| child_ptr.as_ptr() as usize),
            right: node.right.map(|child_ptr| child_ptr.as_ptr() as usize),
        });
        if let Some(left_ptr) = node.left {
            stack.push(left_ptr);
        }
        if let Some(right_ptr) = node.right {
            stack.push(right_ptr);
        }
    }
    TreeView {
        root: tree.root.map(|root_ptr| root_ptr.as_ptr() as usize),
        nodes,
    }
}

impl<K: Ord + Display, V: Display> Viewable for AvlTreeMap<K, V> {
    fn view(&self) -> TreeView {
        snapshot(&self.tree)
    }
}

impl<K: Ord + Display, V: Display> Viewable for TreapMap<K, V> {
    fn view(&self) -> TreeView {
        snapshot(&self.tree)
    }
}

impl<K: Ord + Display, V: Display> Viewable for SplayTreeMap<K, V> {
    fn view(&self) -> TreeView {
        snapshot(&self.tree)
    }
}

impl<K: Ord + Display, V: Display> Viewable for BasicTreeMap<K, V> {
    fn view(&self) -> TreeView {
        snapshot(&self.tree)
    }
}

/// Runs a mutating operation against a map and returns its result together
/// with the snapshots taken immediately before and after it.
pub fn trace<T: Viewable, R, F: FnOnce(&mut T) -> R>(map: &mut T, op: F) -> (R, ForestView) {
    let mut record = vec![map.view()];
    let result = op(map);
    record.push(map.view());
    (result, record)
}
