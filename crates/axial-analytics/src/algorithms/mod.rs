//! In-process graph algorithms (Tier C).
//!
//! All routines work on a [`CompactGraph`]: nodes numbered in ascending id
//! order, so every loop visits nodes deterministically.

pub mod betweenness;
#[cfg(feature = "leiden")]
pub mod leiden;
pub mod louvain;
pub mod pagerank;

use std::collections::BTreeMap;

use crate::extractor::ExtractedGraph;

/// Index-based view of an extracted graph.
#[derive(Debug, Clone)]
pub struct CompactGraph {
    pub ids: Vec<String>,
    /// Directed successors.
    pub out: Vec<Vec<usize>>,
    /// Undirected neighbours with summed edge weight, ascending by index.
    pub undirected: Vec<Vec<(usize, f64)>>,
}

impl CompactGraph {
    pub fn from_extracted(graph: &ExtractedGraph) -> Self {
        let ids: Vec<String> = graph.nodes().keys().cloned().collect();
        let position: BTreeMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

        let n = ids.len();
        let mut out = vec![Vec::new(); n];
        let mut weights: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];

        for edge in graph.edges() {
            let (Some(&s), Some(&t)) = (position.get(edge.source.as_str()), position.get(edge.target.as_str())) else {
                continue;
            };
            out[s].push(t);
            *weights[s].entry(t).or_insert(0.0) += edge.weight;
            *weights[t].entry(s).or_insert(0.0) += edge.weight;
        }
        for successors in &mut out {
            successors.sort_unstable();
            successors.dedup();
        }

        Self {
            ids,
            out,
            undirected: weights.into_iter().map(|w| w.into_iter().collect()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Renumber labels `0..k` in order of first appearance.
pub(crate) fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_graphs {
    use axial_core::{NodeType, RelationType};

    use crate::extractor::{EdgeOrigin, ExtractedGraph, GraphSource};

    /// Directed code graph from `(source, target)` name pairs.
    pub fn directed(edges: &[(&str, &str)]) -> ExtractedGraph {
        let mut graph = ExtractedGraph::new(GraphSource::Relational);
        for (s, t) in edges {
            let s = graph.add_node(NodeType::Code, s);
            let t = graph.add_node(NodeType::Code, t);
            graph.add_edge(&s, &t, RelationType::Associative, EdgeOrigin::Explicit, 1.0);
        }
        graph
    }

    /// Two triangles joined by the bridge `c - d`.
    pub fn barbell() -> ExtractedGraph {
        directed(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d"), ("d", "e"), ("e", "f"), ("f", "d")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_graph() {
        let graph = CompactGraph::from_extracted(&test_graphs::directed(&[("b", "a"), ("a", "c")]));
        assert_eq!(graph.ids, vec!["code:a", "code:b", "code:c"]);
        assert_eq!(graph.out[1], vec![0]);
        assert_eq!(graph.undirected[0], vec![(1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_renumber() {
        assert_eq!(renumber(&[4, 4, 1, 4, 7]), vec![0, 0, 1, 0, 2]);
    }
}
