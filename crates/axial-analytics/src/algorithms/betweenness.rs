//! Brandes betweenness centrality on the undirected, unweighted view.

use std::collections::VecDeque;

use super::CompactGraph;

/// Raw (unnormalized) betweenness. Each unordered pair is counted once.
pub fn betweenness(graph: &CompactGraph) -> Vec<f64> {
    let n = graph.len();
    let mut centrality = vec![0.0; n];

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut distance = vec![-1_i64; n];
        sigma[s] = 1.0;
        distance[s] = 0;

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &(w, _) in &graph.undirected[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    centrality.iter_mut().for_each(|c| *c /= 2.0);
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_graphs;

    #[test]
    fn test_path() {
        let graph = CompactGraph::from_extracted(&test_graphs::directed(&[("a", "b"), ("b", "c")]));
        assert_eq!(betweenness(&graph), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_bridge_nodes_rank_highest() {
        let graph = CompactGraph::from_extracted(&test_graphs::barbell());
        let scores = betweenness(&graph);
        // a b c d e f: the bridge endpoints c and d each sit inside 6 shortest paths.
        assert_eq!(scores[2], 6.0);
        assert_eq!(scores[3], 6.0);
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn test_star_center() {
        let graph = CompactGraph::from_extracted(&test_graphs::directed(&[("hub", "x"), ("hub", "y"), ("hub", "z")]));
        let scores = betweenness(&graph);
        assert_eq!(scores[0], 3.0);
    }
}
