//! Ephemeral adjacency index.
//!
//! Built fresh from an extracted graph on every call and dropped afterwards.
//! Neighbour sets are undirected and ordered so iteration is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::NodeType;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// `node_id -> neighbour set`, plus the type and display name of each node.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    neighbors: BTreeMap<String, BTreeSet<String>>,
    types: BTreeMap<String, NodeType>,
    names: BTreeMap<String, String>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from literal neighbour lists. Every node is typed as a code.
    pub fn from_lists<'a, I, N>(lists: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, N)>,
        N: IntoIterator<Item = &'a str>,
    {
        let mut index = Self::new();
        for (node, neighbors) in lists {
            index.add_node(node, NodeType::Code, node);
            for n in neighbors {
                index.add_node(n, NodeType::Code, n);
                index.add_edge(node, n);
            }
        }
        index
    }

    /// Register a node. Re-adding an existing id keeps its first type and name.
    pub fn add_node(&mut self, id: &str, node_type: NodeType, name: &str) {
        self.neighbors.entry(id.to_string()).or_default();
        self.types.entry(id.to_string()).or_insert(node_type);
        self.names.entry(id.to_string()).or_insert_with(|| name.to_string());
    }

    /// Connect two nodes in both directions. Self-loops are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let inserted = self.neighbors.entry(a.to_string()).or_default().insert(b.to_string());
        self.neighbors.entry(b.to_string()).or_default().insert(a.to_string());
        inserted
    }

    pub fn neighbors(&self, id: &str) -> &BTreeSet<String> {
        self.neighbors.get(id).unwrap_or(&EMPTY)
    }

    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.neighbors.contains_key(id)
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.neighbors(a).contains(b)
    }

    pub fn node_type(&self, id: &str) -> Option<NodeType> {
        self.types.get(id).copied()
    }

    /// Display name of a node, falling back to its id.
    pub fn name<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Node ids of one type, in ascending order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .filter(move |(_, t)| **t == node_type)
            .map(|(id, _)| id.as_str())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.neighbors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.values().map(BTreeSet::len).sum::<usize>() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undirected_edges() {
        let mut index = AdjacencyIndex::new();
        index.add_node("a", NodeType::Code, "A");
        index.add_node("b", NodeType::Category, "B");
        assert!(index.add_edge("a", "b"));
        assert!(!index.add_edge("b", "a"));
        assert!(index.are_connected("b", "a"));
        assert_eq!(index.edge_count(), 1);
        assert_eq!(index.name("b"), "B");
        assert_eq!(index.node_type("b"), Some(NodeType::Category));
    }

    #[test]
    fn test_self_loop_ignored() {
        let mut index = AdjacencyIndex::new();
        index.add_node("a", NodeType::Code, "a");
        assert!(!index.add_edge("a", "a"));
        assert_eq!(index.degree("a"), 0);
    }

    #[test]
    fn test_unknown_node_has_no_neighbors() {
        let index = AdjacencyIndex::new();
        assert!(index.neighbors("ghost").is_empty());
        assert_eq!(index.degree("ghost"), 0);
    }

    #[test]
    fn test_from_lists_and_type_filter() {
        let index = AdjacencyIndex::from_lists(vec![("A", vec!["B", "C"]), ("D", vec!["E"])]);
        assert_eq!(index.len(), 5);
        assert_eq!(index.nodes_of_type(NodeType::Code).count(), 5);
        assert_eq!(index.nodes_of_type(NodeType::Category).count(), 0);
    }
}
