//! Embedding clustering.
//!
//! Works on any `(vectors, labels)` pair, independent of the coding graph.
//! The routines sit behind the `clustering` cargo feature; without it every
//! call fails with a missing-capability error instead of degrading.

#[cfg(feature = "clustering")]
mod density;
#[cfg(feature = "clustering")]
mod partition;

use axial_core::{AxialError, AxialResult, ClusterAlgorithm, ClusterParams, ClusterRow};

/// Validate the input and run the selected routine.
pub fn cluster(
    vectors: &[Vec<f32>],
    labels: &[String],
    algorithm: ClusterAlgorithm,
    params: &ClusterParams,
) -> AxialResult<Vec<ClusterRow>> {
    validate(vectors, labels)?;
    if vectors.is_empty() {
        return Ok(Vec::new());
    }
    run(vectors, labels, algorithm, params)
}

fn validate(vectors: &[Vec<f32>], labels: &[String]) -> AxialResult<()> {
    if vectors.len() != labels.len() {
        return Err(AxialError::invalid_input(format!(
            "{} vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    if first.is_empty() {
        return Err(AxialError::invalid_input("vectors have no dimensions"));
    }
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != first.len() {
            return Err(AxialError::invalid_input(format!(
                "vector {} has dimension {}, expected {}",
                i,
                v.len(),
                first.len()
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(AxialError::invalid_input(format!("vector {} has a non-finite component", i)));
        }
    }
    Ok(())
}

#[cfg(feature = "clustering")]
fn run(
    vectors: &[Vec<f32>],
    labels: &[String],
    algorithm: ClusterAlgorithm,
    params: &ClusterParams,
) -> AxialResult<Vec<ClusterRow>> {
    Ok(match algorithm {
        ClusterAlgorithm::Density => density::dbscan(vectors, labels, params),
        ClusterAlgorithm::Partition => partition::kmeans(vectors, labels, params),
    })
}

#[cfg(not(feature = "clustering"))]
fn run(
    _vectors: &[Vec<f32>],
    _labels: &[String],
    _algorithm: ClusterAlgorithm,
    _params: &ClusterParams,
) -> AxialResult<Vec<ClusterRow>> {
    Err(AxialError::missing_capability(
        "clustering",
        "build axial-analytics with the `clustering` feature enabled",
    ))
}

/// Euclidean distance, accumulated in f64.
#[cfg(feature = "clustering")]
pub(crate) fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
pub(crate) mod test_points {
    /// Two unit squares with centres, far apart.
    pub fn two_blobs() -> (Vec<Vec<f32>>, Vec<String>) {
        let mut vectors = Vec::new();
        let mut labels = Vec::new();
        for (prefix, base) in [("a", 0.0f32), ("b", 20.0)] {
            for (i, (dx, dy)) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.5, 0.5)]
                .into_iter()
                .enumerate()
            {
                vectors.push(vec![base + dx, base + dy]);
                labels.push(format!("{}{}", prefix, i));
            }
        }
        (vectors, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_count_mismatch() {
        let err = cluster(
            &[vec![1.0], vec![2.0]],
            &["a".to_string()],
            ClusterAlgorithm::Partition,
            &ClusterParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AxialError::InvalidInput(_)));
    }

    #[test]
    fn test_ragged_dimensions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let err = cluster(&[vec![1.0, 2.0], vec![2.0]], &labels, ClusterAlgorithm::Density, &ClusterParams::default())
            .unwrap_err();
        assert!(matches!(err, AxialError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_input() {
        let rows = cluster(&[], &[], ClusterAlgorithm::Density, &ClusterParams::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[cfg(not(feature = "clustering"))]
    #[test]
    fn test_missing_capability() {
        let err = cluster(&[vec![1.0]], &["a".to_string()], ClusterAlgorithm::Density, &ClusterParams::default())
            .unwrap_err();
        assert!(matches!(err, AxialError::MissingOptionalCapability { .. }));
    }
}
