//! PageRank by power iteration.
//!
//! Ranks start uniform. Each step, nodes with no successors donate their
//! rank uniformly to every node. Iteration stops when the L1 change drops
//! below the tolerance or the iteration budget runs out.

use axial_core::ResolvedParams;
use tracing::debug;

use super::CompactGraph;

pub fn pagerank(graph: &CompactGraph, params: &ResolvedParams) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        return Vec::new();
    }
    let nf = n as f64;
    let d = params.damping;

    let mut rank = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];

    for iteration in 0..params.max_iterations {
        let dangling: f64 = (0..n).filter(|&i| graph.out[i].is_empty()).map(|i| rank[i]).sum();
        let base = (1.0 - d) / nf + d * dangling / nf;
        next.iter_mut().for_each(|r| *r = base);

        for (u, successors) in graph.out.iter().enumerate() {
            if successors.is_empty() {
                continue;
            }
            let share = d * rank[u] / successors.len() as f64;
            for &v in successors {
                next[v] += share;
            }
        }

        let delta: f64 = rank.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < params.tolerance {
            debug!(iterations = iteration + 1, delta, "PageRank converged");
            break;
        }
    }
    rank
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_graphs;

    fn run(graph: &crate::extractor::ExtractedGraph) -> Vec<f64> {
        pagerank(&CompactGraph::from_extracted(graph), &ResolvedParams::default())
    }

    #[test]
    fn test_ranks_sum_to_one() {
        let ranks = run(&test_graphs::barbell());
        let total: f64 = ranks.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_mass_redistributed() {
        // b has no successors; without redistribution rank would leak.
        let ranks = run(&test_graphs::directed(&[("a", "b")]));
        assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(ranks[1] > ranks[0]);
    }

    #[test]
    fn test_symmetric_cycle_is_uniform() {
        let ranks = run(&test_graphs::directed(&[("a", "b"), ("b", "c"), ("c", "a")]));
        for r in ranks {
            assert!((r - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_iteration_budget() {
        let params = ResolvedParams {
            max_iterations: 0,
            ..ResolvedParams::default()
        };
        let graph = CompactGraph::from_extracted(&test_graphs::directed(&[("a", "b")]));
        assert_eq!(pagerank(&graph, &params), vec![0.5, 0.5]);
    }

    #[test]
    fn test_empty_graph() {
        assert!(run(&crate::extractor::ExtractedGraph::empty()).is_empty());
    }
}
