//! Deterministic Louvain community detection.
//!
//! Local moving visits nodes in index order and moves a node only on a
//! strictly positive modularity gain, preferring the lowest community index
//! on ties. Communities are then aggregated and the process repeats until a
//! level makes no move or the level budget is spent.

use std::collections::BTreeMap;

use tracing::debug;

use super::{renumber, CompactGraph};

const GAIN_EPSILON: f64 = 1e-12;
const MAX_PASSES: usize = 100;

/// Weighted undirected graph with self-loop weights kept apart.
struct Level {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
}

impl Level {
    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree, counting a self-loop twice.
    fn degree(&self, i: usize) -> f64 {
        self.adjacency[i].iter().map(|(_, w)| w).sum::<f64>() + 2.0 * self.self_loops[i]
    }

    /// One round of local moving. Returns the community of each node.
    fn local_moving(&self) -> Vec<usize> {
        let n = self.len();
        let degrees: Vec<f64> = (0..n).map(|i| self.degree(i)).collect();
        let m2: f64 = degrees.iter().sum();
        let mut community: Vec<usize> = (0..n).collect();
        if m2 == 0.0 {
            return community;
        }
        let mut totals = degrees.clone();

        for _ in 0..MAX_PASSES {
            let mut moved = false;
            for i in 0..n {
                let current = community[i];
                let k = degrees[i];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(j, w) in &self.adjacency[i] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                totals[current] -= k;
                let mut best = current;
                let mut best_gain = links.get(&current).copied().unwrap_or(0.0) - totals[current] * k / m2;
                for (&c, &w) in &links {
                    let gain = w - totals[c] * k / m2;
                    if gain > best_gain + GAIN_EPSILON {
                        best = c;
                        best_gain = gain;
                    }
                }
                totals[best] += k;

                if best != current {
                    community[i] = best;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        community
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in &self.adjacency[i] {
                let cj = community[j];
                if ci == cj {
                    // Each internal edge is listed from both ends.
                    self_loops[ci] += w / 2.0;
                } else {
                    *links[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }

        Level {
            adjacency: links.into_iter().map(|l| l.into_iter().collect()).collect(),
            self_loops,
        }
    }
}

/// Community index per node, numbered `0..k` in order of each community's
/// first member.
pub fn louvain(graph: &CompactGraph, max_levels: usize) -> Vec<usize> {
    let n = graph.len();
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level = Level {
        adjacency: graph
            .undirected
            .iter()
            .enumerate()
            .map(|(i, links)| links.iter().copied().filter(|(j, _)| *j != i).collect())
            .collect(),
        self_loops: vec![0.0; n],
    };

    for depth in 0..max_levels.max(1) {
        let community = renumber(&level.local_moving());
        let count = community.iter().max().map_or(0, |m| m + 1);
        for m in membership.iter_mut() {
            *m = community[*m];
        }
        debug!(level = depth, communities = count, "Louvain level done");

        if count == level.len() {
            break;
        }
        level = level.aggregate(&community, count);
    }

    renumber(&membership)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_graphs;

    #[test]
    fn test_barbell_splits_at_bridge() {
        let graph = CompactGraph::from_extracted(&test_graphs::barbell());
        let communities = louvain(&graph, 10);
        assert_eq!(communities, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_disconnected_components() {
        let graph = CompactGraph::from_extracted(&test_graphs::directed(&[("a", "b"), ("c", "d")]));
        assert_eq!(louvain(&graph, 10), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_deterministic() {
        let graph = CompactGraph::from_extracted(&test_graphs::barbell());
        assert_eq!(louvain(&graph, 10), louvain(&graph, 10));
    }

    #[test]
    fn test_empty() {
        let graph = CompactGraph::from_extracted(&crate::extractor::ExtractedGraph::empty());
        assert!(louvain(&graph, 10).is_empty());
    }
}
