//! Algorithm names, computation tiers and result rows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AlgorithmConfig;
use crate::error::AxialError;

/// Graph algorithms exposed by `run_algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmName {
    /// Modularity-based community detection (Louvain).
    Community,
    /// Community detection with connected-community guarantees (Leiden).
    CommunityRefined,
    /// Influence ranking (PageRank).
    CentralityInfluence,
    /// Bridging ranking (betweenness).
    CentralityBridging,
}

impl AlgorithmName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmName::Community => "community",
            AlgorithmName::CommunityRefined => "community_refined",
            AlgorithmName::CentralityInfluence => "centrality_influence",
            AlgorithmName::CentralityBridging => "centrality_bridging",
        }
    }

    pub fn is_community(&self) -> bool {
        matches!(self, AlgorithmName::Community | AlgorithmName::CommunityRefined)
    }

    /// Node property written when results are persisted.
    pub fn property_key(&self) -> &'static str {
        match self {
            AlgorithmName::Community | AlgorithmName::CommunityRefined => "community_id",
            AlgorithmName::CentralityInfluence => "influence_score",
            AlgorithmName::CentralityBridging => "bridging_score",
        }
    }
}

impl FromStr for AlgorithmName {
    type Err = AxialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "community" | "louvain" => Ok(Self::Community),
            "community_refined" | "leiden" => Ok(Self::CommunityRefined),
            "centrality_influence" | "pagerank" => Ok(Self::CentralityInfluence),
            "centrality_bridging" | "betweenness" => Ok(Self::CentralityBridging),
            other => Err(AxialError::InvalidAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call overrides for the algorithm defaults in `EngineConfig`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmParams {
    pub damping: Option<f64>,
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
}

impl AlgorithmParams {
    /// Fill unset values from the configured defaults.
    pub fn resolve(&self, defaults: &AlgorithmConfig) -> ResolvedParams {
        ResolvedParams {
            damping: self.damping.unwrap_or(defaults.damping),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
        }
    }
}

/// Fully specified algorithm parameters handed to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParams {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ResolvedParams {
    fn default() -> Self {
        AlgorithmParams::default().resolve(&AlgorithmConfig::default())
    }
}

/// Ranked computation backends, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Native store with the Graph Data Science extension (Tier A).
    Gds,
    /// Native store with the MAGE procedure library (Tier B).
    Mage,
    /// Extracted graph computed in process (Tier C).
    InProcess,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Gds => "gds",
            Tier::Mage => "mage",
            Tier::InProcess => "in_process",
        }
    }

    pub fn is_native(&self) -> bool {
        !matches!(self, Tier::InProcess)
    }
}

impl FromStr for Tier {
    type Err = AxialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gds" | "a" => Ok(Self::Gds),
            "mage" | "b" => Ok(Self::Mage),
            "in_process" | "inprocess" | "c" => Ok(Self::InProcess),
            other => Err(AxialError::invalid_input(format!("unknown tier '{}'", other))),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the runner had to do differently from what was asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TierEvent {
    Downgrade { from: Tier, to: Tier, reason: String },
    Substitution { requested: AlgorithmName, executed: AlgorithmName, tier: Tier },
    PersistenceSkipped { tier: Tier },
    PersistenceFailed { batch: usize, written: usize, reason: String },
    Unavailable { reason: String },
}

/// One node in an algorithm result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmRow {
    pub name: String,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl AlgorithmRow {
    pub fn community(name: impl Into<String>, labels: Vec<String>, community_id: i64) -> Self {
        Self {
            name: name.into(),
            labels,
            community_id: Some(community_id),
            score: None,
        }
    }

    pub fn scored(name: impl Into<String>, labels: Vec<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            labels,
            community_id: None,
            score: Some(score),
        }
    }
}

/// Apply the ordering contract for an algorithm's rows.
///
/// Communities sort by `(community_id, name)`, centralities by
/// `(score desc, name asc)`. Labels break any remaining tie.
pub fn sort_rows(algorithm: AlgorithmName, rows: &mut [AlgorithmRow]) {
    if algorithm.is_community() {
        rows.sort_by(|a, b| {
            a.community_id
                .cmp(&b.community_id)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.labels.cmp(&b.labels))
        });
    } else {
        rows.sort_by(|a, b| {
            let sa = a.score.unwrap_or(0.0);
            let sb = b.score.unwrap_or(0.0);
            sb.partial_cmp(&sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.labels.cmp(&b.labels))
        });
    }
}

/// Outcome of a `run_algorithm` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmReport {
    pub requested: AlgorithmName,
    pub executed: AlgorithmName,
    pub tier: Option<Tier>,
    pub persisted_rows: usize,
    pub events: Vec<TierEvent>,
    pub rows: Vec<AlgorithmRow>,
}

impl AlgorithmReport {
    pub fn empty(requested: AlgorithmName) -> Self {
        Self {
            requested,
            executed: requested,
            tier: None,
            persisted_rows: 0,
            events: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// Embedding clustering routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    /// Density-based clustering; sparse points become noise.
    Density,
    /// Partition-based clustering into a fixed number of clusters.
    Partition,
}

impl FromStr for ClusterAlgorithm {
    type Err = AxialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "density" | "dbscan" | "hdbscan" => Ok(Self::Density),
            "partition" | "kmeans" | "k_means" => Ok(Self::Partition),
            other => Err(AxialError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Parameters for embedding clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub min_cluster_size: usize,
    pub min_samples: Option<usize>,
    pub eps: Option<f64>,
    pub n_clusters: usize,
    pub max_iterations: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: None,
            eps: None,
            n_clusters: 8,
            max_iterations: 300,
        }
    }
}

/// One labelled vector's cluster assignment.
///
/// `metric` is the membership strength in `[0, 1]` for density clustering
/// (noise is `0`) and the distance to the assigned centroid for partition
/// clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    pub label: String,
    pub cluster_id: i64,
    pub metric: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("community".parse::<AlgorithmName>().unwrap(), AlgorithmName::Community);
        assert_eq!("PageRank".parse::<AlgorithmName>().unwrap(), AlgorithmName::CentralityInfluence);
        assert!(matches!(
            "shortest_path".parse::<AlgorithmName>(),
            Err(AxialError::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn test_sort_centrality() {
        let mut rows = vec![
            AlgorithmRow::scored("b", vec![], 0.5),
            AlgorithmRow::scored("c", vec![], 0.9),
            AlgorithmRow::scored("a", vec![], 0.5),
        ];
        sort_rows(AlgorithmName::CentralityInfluence, &mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_community() {
        let mut rows = vec![
            AlgorithmRow::community("z", vec![], 0),
            AlgorithmRow::community("a", vec![], 1),
            AlgorithmRow::community("m", vec![], 0),
        ];
        sort_rows(AlgorithmName::Community, &mut rows);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["m", "z", "a"]);
    }

    #[test]
    fn test_row_serialization_omits_absent_fields() {
        let json = serde_json::to_string(&AlgorithmRow::community("a", vec!["Code".into()], 2)).unwrap();
        assert_eq!(json, r#"{"name":"a","labels":["Code"],"community_id":2}"#);
    }

    #[test]
    fn test_params_resolve() {
        let params = AlgorithmParams {
            damping: Some(0.5),
            ..Default::default()
        };
        let resolved = params.resolve(&AlgorithmConfig::default());
        assert_eq!(resolved.damping, 0.5);
        assert_eq!(resolved.max_iterations, 100);
        assert_eq!(resolved.tolerance, 1e-6);
    }

    #[test]
    fn test_tier_order() {
        assert!(Tier::Gds < Tier::Mage);
        assert!(Tier::Mage < Tier::InProcess);
        assert!(!Tier::InProcess.is_native());
    }
}
