//! Tier B: Memgraph MAGE procedures.
//!
//! MAGE has no refined community procedure; the runner substitutes plain
//! community detection for it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axial_core::{AlgorithmName, AlgorithmRow, ResolvedParams, Tier};

use super::{parse_algorithm_rows, AnalyticsBackend, ACTIVE_RELATION_SCOPE};
use crate::session::{Column, CypherQuery, GraphSession};

pub const MAGE_RUN: &str = "mage.run";

pub struct MageBackend<'a> {
    session: &'a dyn GraphSession,
}

impl<'a> MageBackend<'a> {
    pub fn new(session: &'a dyn GraphSession) -> Self {
        Self { session }
    }
}

fn procedure_call(algorithm: AlgorithmName) -> Option<&'static str> {
    match algorithm {
        AlgorithmName::Community => Some(
            "CALL community_detection.get_subgraph(nodes, rels) YIELD node, community_id
             RETURN node.name AS name, labels(node) AS labels, community_id",
        ),
        AlgorithmName::CentralityInfluence => Some(
            "CALL pagerank.get_subgraph(nodes, rels, $max_iterations, $damping, $tolerance) YIELD node, rank
             RETURN node.name AS name, labels(node) AS labels, rank AS score",
        ),
        AlgorithmName::CentralityBridging => Some(
            "CALL betweenness_centrality.get_subgraph(nodes, rels, false, true) YIELD node, betweenness_centrality
             RETURN node.name AS name, labels(node) AS labels, betweenness_centrality AS score",
        ),
        AlgorithmName::CommunityRefined => None,
    }
}

#[async_trait]
impl AnalyticsBackend for MageBackend<'_> {
    fn tier(&self) -> Tier {
        Tier::Mage
    }

    fn supports(&self, algorithm: AlgorithmName) -> bool {
        procedure_call(algorithm).is_some()
    }

    async fn run(&self, project_id: &str, algorithm: AlgorithmName, params: &ResolvedParams) -> Result<Vec<AlgorithmRow>> {
        let call = procedure_call(algorithm)
            .with_context(|| format!("MAGE has no procedure for {}", algorithm))?;

        let query = CypherQuery::new(
            MAGE_RUN,
            format!(
                "MATCH (s)-[r:RELATES_TO]->(t)
                 WHERE {ACTIVE_RELATION_SCOPE}
                 WITH collect(DISTINCT r) AS rels, collect(DISTINCT s) + collect(DISTINCT t) AS endpoints
                 UNWIND endpoints AS n
                 WITH rels, collect(DISTINCT n) AS nodes
                 {call}"
            ),
        )
        .param("project_id", project_id)
        .param("damping", params.damping)
        .param("max_iterations", params.max_iterations as i64)
        .param("tolerance", params.tolerance)
        .column("name", Column::Text)
        .column("labels", Column::TextList)
        .column("community_id", Column::Int)
        .column("score", Column::Float);

        let rows = self
            .session
            .query(query)
            .await
            .with_context(|| format!("MAGE {} failed", algorithm))?;
        Ok(parse_algorithm_rows(rows, algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Record;
    use crate::testing::MockSession;
    use serde_json::json;

    #[test]
    fn test_refined_community_unsupported() {
        let session = MockSession::new();
        let backend = MageBackend::new(&session);
        assert!(!backend.supports(AlgorithmName::CommunityRefined));
        assert!(backend.supports(AlgorithmName::Community));
    }

    #[tokio::test]
    async fn test_run_parses_rows() {
        let session = MockSession::new().respond(
            MAGE_RUN,
            vec![Record::new().with("name", "a").with("labels", json!(["Code"])).with("community_id", 4)],
        );
        let rows = MageBackend::new(&session)
            .run("p1", AlgorithmName::Community, &ResolvedParams::default())
            .await
            .unwrap();
        assert_eq!(rows, vec![AlgorithmRow::community("a", vec!["Code".into()], 4)]);
    }
}
