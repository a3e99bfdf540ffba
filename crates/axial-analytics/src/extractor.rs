//! Graph extraction with canonicalization.
//!
//! The native path reads `RELATES_TO` edges between categories and codes.
//! When it is unavailable, fails, or finds nothing, the relational path
//! rebuilds the graph from category assignments, explicit relations and
//! fragment co-occurrence. Every code name is resolved to its canonical
//! identity before it becomes a node. Extraction never fails: when both
//! paths fail the graph is empty.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use axial_core::{
    node_key, split_node_key, AdjacencyIndex, CanonicalIndex, CanonicalResolver, NodeStatus, NodeType,
    RelationType,
};
use axial_graph::queries::extract::fetch_relation_edges;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::Stores;

/// Which store the graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphSource {
    Native,
    Relational,
    Empty,
}

/// Whether an edge was stored or inferred from shared fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    Explicit,
    Cooccurrence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedNode {
    pub name: String,
    pub node_type: NodeType,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedEdge {
    pub source: String,
    pub target: String,
    pub relation_type: RelationType,
    pub origin: EdgeOrigin,
    pub weight: f64,
}

/// A directed, canonicalized graph keyed by node id (`"{type}:{name}"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedGraph {
    nodes: BTreeMap<String, ExtractedNode>,
    edges: Vec<ExtractedEdge>,
    #[serde(skip)]
    seen: BTreeSet<(String, String)>,
    pub source: GraphSource,
}

impl ExtractedGraph {
    pub fn new(source: GraphSource) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            seen: BTreeSet::new(),
            source,
        }
    }

    pub fn empty() -> Self {
        Self::new(GraphSource::Empty)
    }

    pub fn add_node(&mut self, node_type: NodeType, name: &str) -> String {
        let id = node_key(node_type, name);
        self.nodes.entry(id.clone()).or_insert_with(|| ExtractedNode {
            name: name.to_string(),
            node_type,
            labels: vec![node_type.label().to_string()],
        });
        id
    }

    /// Add a directed edge between two registered nodes.
    ///
    /// Self-loops and repeats of an existing directed edge are dropped.
    pub fn add_edge(&mut self, source: &str, target: &str, relation_type: RelationType, origin: EdgeOrigin, weight: f64) -> bool {
        if source == target || !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return false;
        }
        if !self.seen.insert((source.to_string(), target.to_string())) {
            return false;
        }
        self.edges.push(ExtractedEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation_type,
            origin,
            weight,
        });
        true
    }

    pub fn nodes(&self) -> &BTreeMap<String, ExtractedNode> {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&ExtractedNode> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> &[ExtractedEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Undirected view used by the link heuristics.
    pub fn to_adjacency(&self) -> AdjacencyIndex {
        let mut index = AdjacencyIndex::new();
        for (id, node) in &self.nodes {
            index.add_node(id, node.node_type, &node.name);
        }
        for edge in &self.edges {
            index.add_edge(&edge.source, &edge.target);
        }
        index
    }
}

/// Fragments shared by a canonical code pair, `a < b`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CooccurrencePair {
    pub a: String,
    pub b: String,
    pub fragments: Vec<String>,
}

/// Count fragments per canonical code pair, keeping pairs seen in at least
/// `min_fragments` distinct fragments.
pub(crate) fn cooccurrence_pairs(
    codings: &[(String, String)],
    index: &CanonicalIndex,
    min_fragments: usize,
) -> Vec<CooccurrencePair> {
    let mut per_fragment: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for (fragment_id, code) in codings {
        if let Some(canonical) = index.resolve(code) {
            per_fragment.entry(fragment_id.as_str()).or_default().insert(canonical);
        }
    }

    let mut pairs: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for (fragment_id, codes) in per_fragment {
        let codes: Vec<&String> = codes.iter().collect();
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                pairs
                    .entry(((*a).clone(), (*b).clone()))
                    .or_default()
                    .push(fragment_id.to_string());
            }
        }
    }

    pairs
        .into_iter()
        .filter(|(_, fragments)| fragments.len() >= min_fragments)
        .map(|((a, b), fragments)| CooccurrencePair { a, b, fragments })
        .collect()
}

/// Resolve a node name for the graph. Categories are never merged.
fn canonical_name(index: &CanonicalIndex, node_type: NodeType, name: &str, status: NodeStatus) -> Option<String> {
    if node_type != NodeType::Code {
        return Some(name.to_string());
    }
    let resolved = index.resolve(name)?;
    // A merged node the index cannot move anywhere has no canonical identity.
    if status == NodeStatus::Merged && resolved == name {
        return None;
    }
    Some(resolved)
}

pub struct GraphExtractor<'a> {
    stores: Stores<'a>,
    min_cooccurrence: usize,
}

impl<'a> GraphExtractor<'a> {
    pub fn new(stores: Stores<'a>, min_cooccurrence: usize) -> Self {
        Self {
            stores,
            min_cooccurrence: min_cooccurrence.max(1),
        }
    }

    /// Merge pointers for the project. A failing resolver yields an empty
    /// index; codes marked merged are then dropped by status alone.
    pub fn canonical_index(&self, project_id: &str) -> CanonicalIndex {
        match self.stores.db.canonical_index(project_id) {
            Ok(index) => index,
            Err(e) => {
                warn!(project_id, error = %e, "Canonical resolver failed, using node status only");
                CanonicalIndex::new()
            }
        }
    }

    /// Build the canonicalized graph for a project.
    pub async fn extract(&self, project_id: &str) -> ExtractedGraph {
        let index = self.canonical_index(project_id);
        self.extract_with(project_id, &index).await
    }

    /// Build the graph against an already loaded canonical index.
    pub async fn extract_with(&self, project_id: &str, index: &CanonicalIndex) -> ExtractedGraph {
        if let Some(session) = self.stores.graph {
            match self.extract_native(session, project_id, index).await {
                Ok(graph) if !graph.is_empty() => {
                    info!(project_id, nodes = graph.node_count(), edges = graph.edge_count(), "Extracted native graph");
                    return graph;
                }
                Ok(_) => debug!(project_id, "Native graph empty, trying relational store"),
                Err(e) => warn!(project_id, error = %e, "Native extraction failed, trying relational store"),
            }
        }

        match self.extract_relational(project_id, index) {
            Ok(graph) => {
                info!(
                    project_id,
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    "Extracted relational graph"
                );
                graph
            }
            Err(e) => {
                warn!(project_id, error = %e, "Relational extraction failed, returning empty graph");
                ExtractedGraph::empty()
            }
        }
    }

    async fn extract_native(
        &self,
        session: &dyn axial_graph::GraphSession,
        project_id: &str,
        index: &CanonicalIndex,
    ) -> Result<ExtractedGraph> {
        let rows = fetch_relation_edges(session, project_id).await?;
        let mut graph = ExtractedGraph::new(GraphSource::Native);

        for row in rows {
            let (Some(source_type), Some(target_type)) = (
                NodeType::from_labels(&row.source_labels),
                NodeType::from_labels(&row.target_labels),
            ) else {
                continue;
            };
            let Some(source) = canonical_name(index, source_type, &row.source_name, row.source_status) else {
                continue;
            };
            let Some(target) = canonical_name(index, target_type, &row.target_name, row.target_status) else {
                continue;
            };
            let s = graph.add_node(source_type, &source);
            let t = graph.add_node(target_type, &target);
            graph.add_edge(&s, &t, row.relation_type, EdgeOrigin::Explicit, 1.0);
        }
        Ok(graph)
    }

    fn extract_relational(&self, project_id: &str, index: &CanonicalIndex) -> Result<ExtractedGraph> {
        let db = self.stores.db;
        let mut graph = ExtractedGraph::new(GraphSource::Relational);

        let assignments = axial_db::queries::assignments::list_assignments(db, project_id)
            .context("Failed to list category assignments")?;
        for (category, code) in assignments {
            let Some(code) = index.resolve(&code) else { continue };
            let c = graph.add_node(NodeType::Category, &category);
            let k = graph.add_node(NodeType::Code, &code);
            graph.add_edge(&c, &k, RelationType::PartOf, EdgeOrigin::Explicit, 1.0);
        }

        let relations = axial_db::queries::relations::list_relations(db, project_id)
            .context("Failed to list relations")?;
        for edge in relations {
            let (Some((source_type, source)), Some((target_type, target))) =
                (split_node_key(&edge.source_id), split_node_key(&edge.target_id))
            else {
                continue;
            };
            if !matches!(source_type, NodeType::Category | NodeType::Code)
                || !matches!(target_type, NodeType::Category | NodeType::Code)
            {
                continue;
            }
            let Some(source) = canonical_name(index, source_type, source, NodeStatus::Active) else { continue };
            let Some(target) = canonical_name(index, target_type, target, NodeStatus::Active) else { continue };
            let s = graph.add_node(source_type, &source);
            let t = graph.add_node(target_type, &target);
            graph.add_edge(&s, &t, edge.relation_type, EdgeOrigin::Explicit, 1.0);
        }

        let codings = axial_db::queries::fragments::fragment_codings(db, project_id)
            .context("Failed to list fragment codings")?;
        for pair in cooccurrence_pairs(&codings, index, self.min_cooccurrence) {
            let a = graph.add_node(NodeType::Code, &pair.a);
            let b = graph.add_node(NodeType::Code, &pair.b);
            if graph.seen.contains(&(b.clone(), a.clone())) {
                continue;
            }
            graph.add_edge(
                &a,
                &b,
                RelationType::Associative,
                EdgeOrigin::Cooccurrence,
                pair.fragments.len() as f64,
            );
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use axial_core::MergeRecord;
    use axial_graph::queries::extract::RELATION_EDGES;
    use axial_graph::testing::MockSession;
    use axial_graph::Record;
    use serde_json::json;

    fn codings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(f, c)| (f.to_string(), c.to_string())).collect()
    }

    #[test]
    fn test_cooccurrence_noise_floor() {
        let codings = codings(&[("f1", "a"), ("f1", "b"), ("f2", "a"), ("f2", "b"), ("f3", "a"), ("f3", "c")]);
        let pairs = cooccurrence_pairs(&codings, &CanonicalIndex::new(), 2);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a.as_str(), pairs[0].b.as_str()), ("a", "b"));
        assert_eq!(pairs[0].fragments, vec!["f1", "f2"]);
    }

    #[test]
    fn test_cooccurrence_aliases_collapse() {
        // "b" is an alias of "a", so f1 holds a single canonical code.
        let index = CanonicalIndex::from_records(vec![MergeRecord::merged("b", "a")]);
        let codings = codings(&[("f1", "a"), ("f1", "b"), ("f2", "b"), ("f2", "c"), ("f3", "a"), ("f3", "c")]);
        let pairs = cooccurrence_pairs(&codings, &index, 2);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a.as_str(), pairs[0].b.as_str()), ("a", "c"));
        assert_eq!(pairs[0].fragments, vec!["f2", "f3"]);
    }

    #[test]
    fn test_self_loops_dropped() {
        let mut graph = ExtractedGraph::new(GraphSource::Relational);
        let a = graph.add_node(NodeType::Code, "a");
        assert!(!graph.add_edge(&a, &a, RelationType::Causal, EdgeOrigin::Explicit, 1.0));
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_relational_extraction() {
        let db = fixtures::seeded_db();
        let stores = Stores::relational(&db);
        let graph = GraphExtractor::new(stores, 2).extract(fixtures::PROJECT).await;

        assert_eq!(graph.source, GraphSource::Relational);
        // "faith" is merged into "trust" and never becomes a node.
        assert!(graph.node("code:faith").is_none());
        assert!(graph.node("code:trust").is_some());
        assert!(graph
            .edges()
            .iter()
            .any(|e| e.origin == EdgeOrigin::Cooccurrence && e.source == "code:care" && e.target == "code:trust"));
        assert!(graph.edges().iter().all(|e| e.source != e.target));
    }

    #[tokio::test]
    async fn test_native_failure_falls_through() {
        let db = fixtures::seeded_db();
        let session = MockSession::unreachable();
        let stores = Stores::relational(&db).with_graph(&session);
        let graph = GraphExtractor::new(stores, 2).extract(fixtures::PROJECT).await;
        assert_eq!(graph.source, GraphSource::Relational);
        assert!(!graph.is_empty());
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_empty() {
        let db = axial_db::DbPool::in_memory().unwrap();
        let session = MockSession::unreachable();
        let stores = Stores::relational(&db).with_graph(&session);
        let graph = GraphExtractor::new(stores, 2).extract(fixtures::PROJECT).await;
        assert_eq!(graph.source, GraphSource::Empty);
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_native_canonicalization() {
        let db = fixtures::seeded_db();
        let edge = |s: &str, sl: &str, ss: &str, t: &str, tl: &str| {
            Record::new()
                .with("source_name", s)
                .with("source_labels", json!([sl]))
                .with("source_status", ss)
                .with("target_name", t)
                .with("target_labels", json!([tl]))
                .with("target_status", "active")
                .with("relation_type", "causal")
        };
        let session = MockSession::new().respond(
            RELATION_EDGES,
            vec![
                edge("faith", "Code", "merged", "trust", "Code"),
                edge("faith", "Code", "merged", "care", "Code"),
                edge("ghost", "Code", "merged", "care", "Code"),
            ],
        );
        let stores = Stores::relational(&db).with_graph(&session);
        let graph = GraphExtractor::new(stores, 2).extract(fixtures::PROJECT).await;

        assert_eq!(graph.source, GraphSource::Native);
        let ids: Vec<&String> = graph.nodes().keys().collect();
        assert_eq!(ids, vec!["code:care", "code:trust"]);
        // faith->trust collapsed into a self-loop; ghost has no pointer.
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].source, "code:trust");
    }
}
