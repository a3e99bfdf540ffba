//! Density clustering (DBSCAN).
//!
//! When no radius is given it is estimated as the median distance from each
//! point to its `min_samples`-th neighbour (the point itself included).
//! Clusters smaller than `min_cluster_size` are turned into noise (`-1`).
//!
//! The row metric is membership strength: `1.0` for core points, falling
//! linearly to `0.0` at the edge of the radius for border points, `0.0` for
//! noise.

use std::collections::VecDeque;

use axial_core::{ClusterParams, ClusterRow};
use tracing::{debug, warn};

use super::euclidean;

pub fn dbscan(vectors: &[Vec<f32>], labels: &[String], params: &ClusterParams) -> Vec<ClusterRow> {
    let n = vectors.len();
    if n < params.min_cluster_size {
        warn!(
            vectors = n,
            min_cluster_size = params.min_cluster_size,
            "Too few vectors for density clustering"
        );
        return Vec::new();
    }
    let min_samples = params.min_samples.unwrap_or(params.min_cluster_size).max(1);

    let distances: Vec<Vec<f64>> = vectors
        .iter()
        .map(|a| vectors.iter().map(|b| euclidean(a, b)).collect())
        .collect();
    let eps = params
        .eps
        .filter(|e| *e > 0.0)
        .unwrap_or_else(|| estimate_eps(&distances, min_samples));
    debug!(eps, min_samples, "Density clustering radius");

    let neighbors: Vec<Vec<usize>> = distances
        .iter()
        .map(|row| (0..n).filter(|&j| row[j] <= eps).collect())
        .collect();
    let core: Vec<bool> = neighbors.iter().map(|nb| nb.len() >= min_samples).collect();

    let mut cluster: Vec<Option<usize>> = vec![None; n];
    let mut next = 0;
    for start in 0..n {
        if !core[start] || cluster[start].is_some() {
            continue;
        }
        let id = next;
        next += 1;
        cluster[start] = Some(id);
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            if !core[p] {
                continue;
            }
            for &q in &neighbors[p] {
                if cluster[q].is_none() {
                    cluster[q] = Some(id);
                    queue.push_back(q);
                }
            }
        }
    }

    // Undersized clusters become noise; survivors are renumbered in order.
    let mut sizes = vec![0usize; next];
    for c in cluster.iter().flatten() {
        sizes[*c] += 1;
    }
    let mut renumbered: Vec<Option<usize>> = vec![None; next];
    let mut kept = 0;
    for (c, size) in sizes.iter().enumerate() {
        if *size >= params.min_cluster_size {
            renumbered[c] = Some(kept);
            kept += 1;
        }
    }
    debug!(clusters = kept, dropped = next - kept, "Density clustering done");

    let mut rows: Vec<ClusterRow> = (0..n)
        .map(|i| {
            let assigned = cluster[i].and_then(|c| renumbered[c]);
            let metric = match assigned {
                None => 0.0,
                Some(_) if core[i] => 1.0,
                Some(_) => {
                    let nearest_core = neighbors[i]
                        .iter()
                        .filter(|&&j| core[j] && cluster[j] == cluster[i])
                        .map(|&j| distances[i][j])
                        .fold(f64::INFINITY, f64::min);
                    (1.0 - nearest_core / eps).clamp(0.0, 1.0)
                }
            };
            ClusterRow {
                label: labels[i].clone(),
                cluster_id: assigned.map_or(-1, |c| c as i64),
                metric,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.cluster_id.cmp(&b.cluster_id).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// Median k-distance over all points.
fn estimate_eps(distances: &[Vec<f64>], min_samples: usize) -> f64 {
    let k = min_samples.saturating_sub(1).max(1);
    let mut kth: Vec<f64> = distances
        .iter()
        .map(|row| {
            let mut sorted = row.clone();
            sorted.sort_by(f64::total_cmp);
            sorted[k.min(sorted.len() - 1)]
        })
        .collect();
    kth.sort_by(f64::total_cmp);
    let median = kth.get(kth.len() / 2).copied().unwrap_or(0.0);
    if median > 0.0 {
        median
    } else {
        f64::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::test_points::two_blobs;

    fn params(min_cluster_size: usize) -> ClusterParams {
        ClusterParams {
            min_cluster_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_too_few_vectors_returns_empty() {
        let vectors = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert!(dbscan(&vectors, &labels, &params(5)).is_empty());
    }

    #[test]
    fn test_blobs_and_outlier() {
        let (mut vectors, mut labels) = two_blobs();
        vectors.push(vec![100.0, 100.0]);
        labels.push("outlier".to_string());

        let rows = dbscan(&vectors, &labels, &params(3));
        assert_eq!(rows[0].label, "outlier");
        assert_eq!(rows[0].cluster_id, -1);
        assert_eq!(rows[0].metric, 0.0);
        assert!(rows[1..6].iter().all(|r| r.cluster_id == 0 && r.label.starts_with('a')));
        assert!(rows[6..].iter().all(|r| r.cluster_id == 1 && r.label.starts_with('b')));
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.metric)));
    }

    #[test]
    fn test_small_cluster_becomes_noise() {
        let (vectors, labels) = two_blobs();
        let params = ClusterParams {
            min_cluster_size: 6,
            min_samples: Some(2),
            eps: Some(1.0),
            ..Default::default()
        };
        let rows = dbscan(&vectors, &labels, &params);
        assert!(rows.iter().all(|r| r.cluster_id == -1));
    }

    #[test]
    fn test_explicit_radius_merges_everything() {
        let (vectors, labels) = two_blobs();
        let params = ClusterParams {
            min_cluster_size: 2,
            min_samples: Some(2),
            eps: Some(100.0),
            ..Default::default()
        };
        let rows = dbscan(&vectors, &labels, &params);
        assert!(rows.iter().all(|r| r.cluster_id == 0 && r.metric == 1.0));
    }
}
