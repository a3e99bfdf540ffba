//! Connected-community refinement.
//!
//! Louvain can leave a community internally disconnected once its bridging
//! node moves away. The refinement splits every community into its
//! connected parts, so each returned community induces a connected subgraph.

use std::collections::VecDeque;

use super::louvain::louvain;
use super::CompactGraph;

/// Louvain followed by splitting communities into connected components.
pub fn leiden(graph: &CompactGraph, max_levels: usize) -> Vec<usize> {
    refine_connected(graph, &louvain(graph, max_levels))
}

/// Split each community into connected components, numbered in order of
/// each component's first member.
pub fn refine_connected(graph: &CompactGraph, communities: &[usize]) -> Vec<usize> {
    let n = graph.len();
    let mut refined: Vec<Option<usize>> = vec![None; n];
    let mut next = 0;

    for start in 0..n {
        if refined[start].is_some() {
            continue;
        }
        let label = next;
        next += 1;
        refined[start] = Some(label);

        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            for &(w, _) in &graph.undirected[v] {
                if refined[w].is_none() && communities[w] == communities[start] {
                    refined[w] = Some(label);
                    queue.push_back(w);
                }
            }
        }
    }

    refined.into_iter().map(|r| r.unwrap_or(0)).collect()
}
