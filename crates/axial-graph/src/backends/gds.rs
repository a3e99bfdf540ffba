//! Tier A: Graph Data Science.
//!
//! Each run projects a uniquely named in-memory graph with a Cypher
//! projection, streams the algorithm over it, and always drops the
//! projection afterwards.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axial_core::{AlgorithmName, AlgorithmRow, ResolvedParams, Tier};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{parse_algorithm_rows, AnalyticsBackend, ACTIVE_RELATION_SCOPE};
use crate::session::{Column, CypherQuery, GraphSession};

pub const GDS_PROJECT: &str = "gds.project";
pub const GDS_STREAM: &str = "gds.stream";
pub const GDS_DROP: &str = "gds.drop";

pub struct GdsBackend<'a> {
    session: &'a dyn GraphSession,
}

impl<'a> GdsBackend<'a> {
    pub fn new(session: &'a dyn GraphSession) -> Self {
        Self { session }
    }

    async fn project(&self, project_id: &str, graph_name: &str, undirected: bool) -> Result<i64> {
        let query = CypherQuery::new(
            GDS_PROJECT,
            format!(
                "MATCH (s)-[:RELATES_TO]->(t)
                 WHERE {ACTIVE_RELATION_SCOPE}
                 WITH gds.graph.project($graph_name, s, t, {{}},
                      {{undirectedRelationshipTypes: $undirected}}) AS g
                 RETURN g.graphName AS graph_name, g.nodeCount AS node_count"
            ),
        )
        .param("project_id", project_id)
        .param("graph_name", graph_name)
        .param("undirected", if undirected { json!(["*"]) } else { json!([]) })
        .column("graph_name", Column::Text)
        .column("node_count", Column::Int);

        let rows = self.session.query(query).await.context("GDS projection failed")?;
        Ok(rows.first().and_then(|r| r.int("node_count")).unwrap_or(0))
    }

    async fn stream(&self, graph_name: &str, algorithm: AlgorithmName, params: &ResolvedParams) -> Result<Vec<AlgorithmRow>> {
        let (call, yielded) = match algorithm {
            AlgorithmName::Community => (
                "CALL gds.louvain.stream($graph_name) YIELD nodeId, communityId",
                "communityId AS community_id",
            ),
            AlgorithmName::CommunityRefined => (
                "CALL gds.leiden.stream($graph_name) YIELD nodeId, communityId",
                "communityId AS community_id",
            ),
            AlgorithmName::CentralityInfluence => (
                "CALL gds.pageRank.stream($graph_name, {dampingFactor: $damping,
                      maxIterations: $max_iterations, tolerance: $tolerance})
                 YIELD nodeId, score",
                "score AS score",
            ),
            AlgorithmName::CentralityBridging => (
                "CALL gds.betweenness.stream($graph_name) YIELD nodeId, score",
                "score AS score",
            ),
        };

        let query = CypherQuery::new(
            GDS_STREAM,
            format!(
                "{call}
                 WITH gds.util.asNode(nodeId) AS n, {yielded}
                 RETURN n.name AS name, labels(n) AS labels, {}",
                if algorithm.is_community() { "community_id" } else { "score" }
            ),
        )
        .param("graph_name", graph_name)
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
            .with_context(|| format!("GDS {} stream failed", algorithm))?;
        Ok(parse_algorithm_rows(rows, algorithm))
    }

    async fn drop_projection(&self, graph_name: &str) {
        let query = CypherQuery::new(
            GDS_DROP,
            "CALL gds.graph.drop($graph_name, false) YIELD graphName RETURN graphName",
        )
        .param("graph_name", graph_name);
        if let Err(e) = self.session.execute(query).await {
            warn!(graph = graph_name, error = %e, "Failed to drop GDS projection");
        }
    }
}

#[async_trait]
impl AnalyticsBackend for GdsBackend<'_> {
    fn tier(&self) -> Tier {
        Tier::Gds
    }

    fn supports(&self, _algorithm: AlgorithmName) -> bool {
        true
    }

    async fn run(&self, project_id: &str, algorithm: AlgorithmName, params: &ResolvedParams) -> Result<Vec<AlgorithmRow>> {
        let graph_name = format!("axial_{}", Uuid::new_v4().simple());
        // PageRank follows edge direction; the others run undirected.
        let undirected = algorithm != AlgorithmName::CentralityInfluence;

        let node_count = self.project(project_id, &graph_name, undirected).await?;
        debug!(graph = %graph_name, node_count, algorithm = %algorithm, "GDS projection ready");

        let result = if node_count == 0 {
            Ok(Vec::new())
        } else {
            self.stream(&graph_name, algorithm, params).await
        };
        self.drop_projection(&graph_name).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Record;
    use crate::testing::MockSession;

    #[tokio::test]
    async fn test_run_projects_streams_and_drops() {
        let session = MockSession::new()
            .respond(GDS_PROJECT, vec![Record::new().with("node_count", 2)])
            .respond(
                GDS_STREAM,
                vec![
                    Record::new().with("name", "a").with("labels", json!(["Code"])).with("score", 0.6),
                    Record::new().with("name", "b").with("labels", json!(["Code"])).with("score", 0.4),
                ],
            );
        let backend = GdsBackend::new(&session);
        let rows = backend
            .run("p1", AlgorithmName::CentralityInfluence, &ResolvedParams::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(session.executed_names(), vec![GDS_PROJECT, GDS_STREAM, GDS_DROP]);

        let seen = session.seen();
        assert_eq!(seen[0].param_value("graph_name"), seen[2].param_value("graph_name"));
        assert_eq!(seen[0].param_value("undirected"), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_drop_runs_after_stream_failure() {
        let session = MockSession::new()
            .respond(GDS_PROJECT, vec![Record::new().with("node_count", 3)])
            .fail(GDS_STREAM);
        let backend = GdsBackend::new(&session);
        let result = backend
            .run("p1", AlgorithmName::Community, &ResolvedParams::default())
            .await;
        assert!(result.is_err());
        assert_eq!(session.executed_names().last(), Some(&GDS_DROP));
    }

    #[tokio::test]
    async fn test_empty_projection_skips_stream() {
        let session = MockSession::new().respond(GDS_PROJECT, vec![Record::new().with("node_count", 0)]);
        let rows = GdsBackend::new(&session)
            .run("p1", AlgorithmName::CentralityBridging, &ResolvedParams::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(session.executed_names(), vec![GDS_PROJECT, GDS_DROP]);
    }
}
