//! Append-only node storage shared by every tree of a forest.

use super::node::Node;
use super::NodeId;

/// Growable store of [`Node`]s addressed by index.
///
/// Nodes are never removed. Anything that refers to a node stores its
/// [`NodeId`] and resolves it again on every access, because appending may
/// move the backing storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, internal and leaf, across all trees.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node and return its index.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// # Panics
    ///
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Replace the node at `id`, returning the old one.
    pub(crate) fn replace(&mut self, id: NodeId, node: Node) -> Node {
        std::mem::replace(&mut self.nodes[id], node)
    }

    /// Walk from `root` to the leaf whose region contains `point`.
    ///
    /// Points on a boundary go to the low child.
    ///
    /// # Panics
    ///
    /// Panics if `point` is shorter than a split dimension on the path.
    pub fn descend(&self, root: NodeId, point: &[f64]) -> NodeId {
        let mut id = root;
        while let Node::Internal { split, .. } = self.get(id) {
            id = split.child_for(point);
        }
        id
    }
}
