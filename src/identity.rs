//! Canonical identity assignment.

use crate::compose::{ComposedGraph, NodeInstance};
use crate::links::NodeType;
use std::collections::HashMap;

/// The composed graph renumbered into the sequential-integer address space
/// of the wire format: ids `1..=N`, no gaps, assigned in the composed
/// graph's insertion order. The key→id table is retained for callers that
/// still hold fragment-key references.
#[derive(Debug)]
pub struct CanonicalGraph {
    nodes: Vec<(u32, NodeInstance)>,
    key_to_id: HashMap<String, u32>,
}

impl CanonicalGraph {
    /// Enumerate the composed graph in insertion order and assign ids.
    pub fn assign(composed: ComposedGraph) -> Self {
        let mut nodes = Vec::new();
        let mut key_to_id = HashMap::new();
        for (index, (key, node)) in composed.into_entries().into_iter().enumerate() {
            let id = index as u32 + 1;
            key_to_id.insert(key, id);
            nodes.push((id, node));
        }
        Self { nodes, key_to_id }
    }

    /// Nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &NodeInstance)> {
        self.nodes.iter().map(|(id, n)| (*id, n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn id_of(&self, key: &str) -> Option<u32> {
        self.key_to_id.get(key).copied()
    }

    /// Lowest id carrying the given type, if any.
    pub fn first_of_type(&self, node_type: &NodeType) -> Option<u32> {
        self.nodes
            .iter()
            .find(|(_, n)| &n.node_type == node_type)
            .map(|(id, _)| *id)
    }
}
