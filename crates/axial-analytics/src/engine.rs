//! Engine facade.
//!
//! One [`AnalyticsEngine`] per configuration. It owns nothing but its config
//! and the probe cache; stores are lent by the caller on every call.

use axial_core::{
    AlgorithmName, AlgorithmParams, AlgorithmReport, AxialError, AxialResult, ClusterAlgorithm, ClusterParams,
    ClusterRow, EngineConfig, EvidencePack, NodeType, SemanticFallback, Suggestion,
};
use axial_db::DbPool;
use axial_graph::{CapabilityReport, GraphSession, ProbeCache};
use tracing::info;

use crate::clustering;
use crate::discovery::HiddenRelationshipDiscoverer;
use crate::evidence::EvidencePackBuilder;
use crate::extractor::GraphExtractor;
use crate::link_prediction::{Heuristic, LinkPredictor};
use crate::runner::AlgorithmRunner;

/// Stores borrowed for the duration of one call.
#[derive(Clone, Copy)]
pub struct Stores<'a> {
    pub graph: Option<&'a dyn GraphSession>,
    pub db: &'a DbPool,
    pub semantic: Option<&'a dyn SemanticFallback>,
}

impl<'a> Stores<'a> {
    /// Relational store only.
    pub fn relational(db: &'a DbPool) -> Self {
        Self {
            graph: None,
            db,
            semantic: None,
        }
    }

    pub fn with_graph(mut self, graph: &'a dyn GraphSession) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_semantic(mut self, semantic: &'a dyn SemanticFallback) -> Self {
        self.semantic = Some(semantic);
        self
    }
}

pub struct AnalyticsEngine {
    config: EngineConfig,
    probe_cache: ProbeCache,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> AxialResult<Self> {
        config.validate()?;
        let probe_cache = ProbeCache::from_config(&config.probe);
        Ok(Self { config, probe_cache })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn probe_cache(&self) -> &ProbeCache {
        &self.probe_cache
    }

    /// Tiers usable with the lent stores, best first.
    pub async fn probe(&self, stores: &Stores<'_>) -> CapabilityReport {
        self.probe_cache.detect(stores.graph).await
    }

    /// Run a graph algorithm on the best available tier.
    ///
    /// Only an unknown algorithm name is an error. Tier failures downgrade,
    /// and a call no tier can serve returns an empty report.
    pub async fn run_algorithm(
        &self,
        stores: &Stores<'_>,
        name: &str,
        project_id: &str,
        persist: bool,
        params: AlgorithmParams,
    ) -> AxialResult<AlgorithmReport> {
        let algorithm: AlgorithmName = name.parse()?;
        if let Some(damping) = params.damping {
            if !(damping > 0.0 && damping < 1.0) {
                return Err(AxialError::invalid_input(format!("damping must be in (0, 1), got {}", damping)));
            }
        }
        info!(project_id, algorithm = %algorithm, persist, "Running algorithm");
        let runner = AlgorithmRunner::new(&self.config, &self.probe_cache, *stores);
        Ok(runner.run(project_id, algorithm, persist, &params).await)
    }

    /// Cluster labelled vectors. Independent of any store.
    pub fn cluster_embeddings(
        &self,
        vectors: &[Vec<f32>],
        labels: &[String],
        algorithm: &str,
        params: &ClusterParams,
    ) -> AxialResult<Vec<ClusterRow>> {
        let algorithm: ClusterAlgorithm = algorithm.parse()?;
        clustering::cluster(vectors, labels, algorithm, params)
    }

    /// Rank unconnected node pairs with a link heuristic.
    pub async fn suggest_links(
        &self,
        stores: &Stores<'_>,
        project_id: &str,
        source_type: &str,
        target_type: &str,
        algorithm: &str,
        top_k: usize,
        min_score: f64,
    ) -> AxialResult<Vec<Suggestion>> {
        let heuristic: Heuristic = algorithm.parse()?;
        let source_type = NodeType::parse(source_type)?;
        let target_type = NodeType::parse(target_type)?;

        let graph = GraphExtractor::new(*stores, self.config.discovery.min_cooccurrence)
            .extract(project_id)
            .await;
        let index = graph.to_adjacency();
        let suggestions = LinkPredictor::new(&index).predict(heuristic, source_type, target_type, top_k, min_score);
        info!(
            project_id,
            heuristic = heuristic.as_str(),
            suggestions = suggestions.len(),
            "Link prediction complete"
        );
        Ok(suggestions)
    }

    /// Find code pairs the graph implies but nobody has linked.
    pub async fn discover_hidden_relationships(
        &self,
        stores: &Stores<'_>,
        project_id: &str,
        top_k: usize,
    ) -> AxialResult<Vec<Suggestion>> {
        let discoverer = HiddenRelationshipDiscoverer::new(*stores, &self.config.discovery);
        Ok(discoverer.discover(project_id, top_k).await)
    }

    /// Gather positive and contrasting fragments for each suggestion.
    ///
    /// `excerpt_chars` overrides the configured excerpt length.
    pub async fn build_evidence_pack(
        &self,
        stores: &Stores<'_>,
        project_id: &str,
        suggestions: &[Suggestion],
        positive_total: usize,
        negative_total: usize,
        excerpt_chars: Option<usize>,
    ) -> AxialResult<EvidencePack> {
        if let Some(s) = suggestions.iter().find(|s| s.source.trim().is_empty() || s.target.trim().is_empty()) {
            return Err(AxialError::invalid_input(format!("suggestion '{}' has an empty endpoint", s.id)));
        }
        let mut evidence = self.config.evidence.clone();
        if let Some(chars) = excerpt_chars {
            evidence.excerpt_chars = chars;
        }
        let builder = EvidencePackBuilder::new(*stores, &evidence);
        Ok(builder.build(project_id, suggestions, positive_total, negative_total).await)
    }
}
