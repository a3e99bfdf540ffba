//! Deterministic k-means.
//!
//! Seeds with farthest-point traversal starting at the first vector, so the
//! same input always yields the same partition.

use axial_core::{ClusterParams, ClusterRow};
use tracing::debug;

use super::euclidean;

const CONVERGENCE: f64 = 1e-9;

pub fn kmeans(vectors: &[Vec<f32>], labels: &[String], params: &ClusterParams) -> Vec<ClusterRow> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    let k = params.n_clusters.clamp(1, n);
    if k < params.n_clusters {
        debug!(requested = params.n_clusters, clamped = k, "Cluster count clamped to input size");
    }

    let mut centroids = seeds(vectors, k);
    let mut assignments = vec![0usize; n];
    for iteration in 0..params.max_iterations.max(1) {
        assign(vectors, &centroids, &mut assignments);
        let next = recompute(vectors, &assignments, &centroids);
        let movement = centroids
            .iter()
            .zip(&next)
            .map(|(a, b)| distance(a, b))
            .fold(0.0, f64::max);
        centroids = next;
        if movement < CONVERGENCE {
            debug!(iterations = iteration + 1, "k-means converged");
            break;
        }
    }
    assign(vectors, &centroids, &mut assignments);

    let mut rows: Vec<ClusterRow> = labels
        .iter()
        .zip(vectors)
        .zip(&assignments)
        .map(|((label, v), &c)| ClusterRow {
            label: label.clone(),
            cluster_id: c as i64,
            metric: distance_to(v, &centroids[c]),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.cluster_id
            .cmp(&b.cluster_id)
            .then_with(|| a.metric.total_cmp(&b.metric))
            .then_with(|| a.label.cmp(&b.label))
    });
    rows
}

/// Farthest-point seeding from vector 0. Ties go to the lowest index.
fn seeds(vectors: &[Vec<f32>], k: usize) -> Vec<Vec<f64>> {
    let mut chosen = vec![0usize];
    let mut nearest: Vec<f64> = vectors.iter().map(|v| euclidean(v, &vectors[0])).collect();

    while chosen.len() < k {
        let mut best = None;
        for (i, d) in nearest.iter().enumerate() {
            if chosen.contains(&i) {
                continue;
            }
            if best.map_or(true, |(_, bd)| *d > bd) {
                best = Some((i, *d));
            }
        }
        let Some((next, _)) = best else { break };
        chosen.push(next);
        for (i, v) in vectors.iter().enumerate() {
            nearest[i] = nearest[i].min(euclidean(v, &vectors[next]));
        }
    }

    chosen
        .into_iter()
        .map(|i| vectors[i].iter().map(|x| f64::from(*x)).collect())
        .collect()
}

fn assign(vectors: &[Vec<f32>], centroids: &[Vec<f64>], assignments: &mut [usize]) {
    for (v, slot) in vectors.iter().zip(assignments.iter_mut()) {
        let mut best = (0, f64::INFINITY);
        for (c, centroid) in centroids.iter().enumerate() {
            let d = distance_to(v, centroid);
            if d < best.1 {
                best = (c, d);
            }
        }
        *slot = best.0;
    }
}

/// Mean of each cluster's members. An empty cluster keeps its centroid.
fn recompute(vectors: &[Vec<f32>], assignments: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (v, &c) in vectors.iter().zip(assignments) {
        counts[c] += 1;
        for (s, x) in sums[c].iter_mut().zip(v) {
            *s += f64::from(*x);
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

fn distance_to(v: &[f32], centroid: &[f64]) -> f64 {
    v.iter()
        .zip(centroid)
        .map(|(x, c)| {
            let d = f64::from(*x) - c;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
