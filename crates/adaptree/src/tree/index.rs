//! Sorted label -> root lookup.

use super::arena::NodeArena;
use super::node::Node;
use super::{Label, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    label: Label,
    root: NodeId,
}

/// Maps each label to the root of its tree, sorted by label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForestIndex {
    entries: Vec<Entry>,
}

impl ForestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of `label`'s tree, if the label has been seen.
    pub fn resolve(&self, label: Label) -> Option<NodeId> {
        self.entries
            .binary_search_by_key(&label, |e| e.label)
            .ok()
            .map(|i| self.entries[i].root)
    }

    /// Root of `label`'s tree, allocating an empty leaf for a new label.
    pub fn resolve_or_create(&mut self, label: Label, arena: &mut NodeArena) -> NodeId {
        match self.entries.binary_search_by_key(&label, |e| e.label) {
            Ok(i) => self.entries[i].root,
            Err(i) => {
                let root = arena.push(Node::default());
                self.entries.insert(i, Entry { label, root });
                root
            }
        }
    }

    /// Number of labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, root)` pairs in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, NodeId)> + '_ {
        self.entries.iter().map(|e| (e.label, e.root))
    }

    /// Roots of the candidate labels that are present, in candidate order.
    ///
    /// `candidates` must be sorted ascending. The scan walks both lists once
    /// and stops as soon as the index is exhausted.
    pub fn matching<'a>(&'a self, candidates: &'a [Label]) -> impl Iterator<Item = NodeId> + 'a {
        let mut j = 0;
        let entries = &self.entries;
        candidates.iter().map_while(move |&label| {
            while j < entries.len() && entries[j].label < label {
                j += 1;
            }
            if j >= entries.len() {
                return None;
            }
            Some((entries[j].label == label).then_some(entries[j].root))
        })
        .flatten()
    }
}
