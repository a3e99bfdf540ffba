//! Tiered algorithm execution.
//!
//! The runner asks the probe for the usable tiers and tries them best
//! first. A failing tier hands the call to the next one; an unsupported
//! algorithm is replaced by its nearest supported variant. Every such
//! decision is logged and recorded in the report.

use anyhow::Result;
use async_trait::async_trait;
use axial_core::{
    algorithm::sort_rows, AlgorithmName, AlgorithmParams, AlgorithmReport, AlgorithmRow, EngineConfig,
    ResolvedParams, Tier, TierEvent,
};
use axial_graph::{persist_rows, AnalyticsBackend, CapabilityReport, GdsBackend, MageBackend, ProbeCache};
use tracing::{info, warn};

use crate::algorithms::{betweenness::betweenness, louvain::louvain, pagerank::pagerank, CompactGraph};
use crate::engine::Stores;
use crate::extractor::{ExtractedGraph, GraphExtractor};

/// Tier C: algorithms computed over the extracted graph.
pub struct InProcessBackend<'a> {
    extractor: GraphExtractor<'a>,
    max_levels: usize,
}

impl<'a> InProcessBackend<'a> {
    pub fn new(extractor: GraphExtractor<'a>, max_levels: usize) -> Self {
        Self { extractor, max_levels }
    }
}

#[async_trait]
impl AnalyticsBackend for InProcessBackend<'_> {
    fn tier(&self) -> Tier {
        Tier::InProcess
    }

    fn supports(&self, algorithm: AlgorithmName) -> bool {
        algorithm != AlgorithmName::CommunityRefined || cfg!(feature = "leiden")
    }

    async fn run(&self, project_id: &str, algorithm: AlgorithmName, params: &ResolvedParams) -> Result<Vec<AlgorithmRow>> {
        let graph = self.extractor.extract(project_id).await;
        Ok(compute_in_process(&graph, algorithm, params, self.max_levels))
    }
}

#[cfg(feature = "leiden")]
fn refined_communities(graph: &CompactGraph, max_levels: usize) -> Vec<usize> {
    crate::algorithms::leiden::leiden(graph, max_levels)
}

#[cfg(not(feature = "leiden"))]
fn refined_communities(graph: &CompactGraph, max_levels: usize) -> Vec<usize> {
    louvain(graph, max_levels)
}

/// Run one algorithm over an extracted graph. An empty graph gives no rows.
pub fn compute_in_process(
    graph: &ExtractedGraph,
    algorithm: AlgorithmName,
    params: &ResolvedParams,
    max_levels: usize,
) -> Vec<AlgorithmRow> {
    let compact = CompactGraph::from_extracted(graph);
    let nodes: Vec<(String, Vec<String>)> = compact
        .ids
        .iter()
        .map(|id| match graph.node(id) {
            Some(node) => (node.name.clone(), node.labels.clone()),
            None => (id.clone(), Vec::new()),
        })
        .collect();

    let communities = |labels: Vec<usize>| -> Vec<AlgorithmRow> {
        nodes
            .iter()
            .zip(labels)
            .map(|((name, node_labels), c)| AlgorithmRow::community(name.clone(), node_labels.clone(), c as i64))
            .collect()
    };
    let scores = |values: Vec<f64>| -> Vec<AlgorithmRow> {
        nodes
            .iter()
            .zip(values)
            .map(|((name, node_labels), s)| AlgorithmRow::scored(name.clone(), node_labels.clone(), s))
            .collect()
    };

    let mut rows = match algorithm {
        AlgorithmName::Community => communities(louvain(&compact, max_levels)),
        AlgorithmName::CommunityRefined => communities(refined_communities(&compact, max_levels)),
        AlgorithmName::CentralityInfluence => scores(pagerank(&compact, params)),
        AlgorithmName::CentralityBridging => scores(betweenness(&compact)),
    };
    sort_rows(algorithm, &mut rows);
    rows
}

/// Nearest supported variant of an algorithm.
fn substitute(algorithm: AlgorithmName) -> AlgorithmName {
    match algorithm {
        AlgorithmName::CommunityRefined => AlgorithmName::Community,
        other => other,
    }
}

pub struct AlgorithmRunner<'a> {
    config: &'a EngineConfig,
    probe_cache: &'a ProbeCache,
    stores: Stores<'a>,
}

impl<'a> AlgorithmRunner<'a> {
    pub fn new(config: &'a EngineConfig, probe_cache: &'a ProbeCache, stores: Stores<'a>) -> Self {
        Self {
            config,
            probe_cache,
            stores,
        }
    }

    /// Backends for the detected tiers, best first.
    fn chain(&self, capability: &CapabilityReport) -> Vec<Box<dyn AnalyticsBackend + 'a>> {
        let mut chain: Vec<Box<dyn AnalyticsBackend + 'a>> = Vec::new();
        for tier in &capability.tiers {
            match (tier, self.stores.graph) {
                (Tier::Gds, Some(session)) => chain.push(Box::new(GdsBackend::new(session))),
                (Tier::Mage, Some(session)) => chain.push(Box::new(MageBackend::new(session))),
                (Tier::InProcess, _) => chain.push(Box::new(InProcessBackend::new(
                    GraphExtractor::new(self.stores, self.config.discovery.min_cooccurrence),
                    self.config.algorithms.louvain_max_levels,
                ))),
                (tier, None) => warn!(tier = %tier, "Native tier selected without a native session, skipping"),
            }
        }
        chain
    }

    pub async fn run(
        &self,
        project_id: &str,
        algorithm: AlgorithmName,
        persist: bool,
        params: &AlgorithmParams,
    ) -> AlgorithmReport {
        let mut report = AlgorithmReport::empty(algorithm);
        let resolved = params.resolve(&self.config.algorithms);
        let capability = self.probe_cache.detect(self.stores.graph).await;
        let chain = self.chain(&capability);

        for (position, backend) in chain.iter().enumerate() {
            let tier = backend.tier();
            let executed = if backend.supports(algorithm) {
                algorithm
            } else {
                substitute(algorithm)
            };
            if executed != algorithm {
                warn!(requested = %algorithm, executed = %executed, tier = %tier, "Algorithm substituted");
                report.events.push(TierEvent::Substitution {
                    requested: algorithm,
                    executed,
                    tier,
                });
            }

            match backend.run(project_id, executed, &resolved).await {
                Ok(mut rows) => {
                    sort_rows(executed, &mut rows);
                    report.executed = executed;
                    report.tier = Some(tier);
                    report.rows = rows;
                    if persist {
                        self.persist(project_id, &mut report).await;
                    }
                    info!(
                        project_id,
                        algorithm = %executed,
                        tier = %tier,
                        rows = report.rows.len(),
                        persisted = report.persisted_rows,
                        "Algorithm complete"
                    );
                    return report;
                }
                Err(e) => {
                    if let Some(next) = chain.get(position + 1) {
                        warn!(from = %tier, to = %next.tier(), error = %e, "Tier failed, downgrading");
                        report.events.push(TierEvent::Downgrade {
                            from: tier,
                            to: next.tier(),
                            reason: e.to_string(),
                        });
                    } else {
                        warn!(tier = %tier, error = %e, "Last tier failed");
                    }
                }
            }
        }

        warn!(project_id, algorithm = %algorithm, "No computation tier produced a result");
        report.events.push(TierEvent::Unavailable {
            reason: "no computation tier produced a result".to_string(),
        });
        report
    }

    async fn persist(&self, project_id: &str, report: &mut AlgorithmReport) {
        let Some(tier) = report.tier else { return };
        let session = match self.stores.graph {
            Some(session) if tier.is_native() => session,
            _ => {
                info!(tier = %tier, "Persistence skipped, results are not tied to native nodes");
                report.events.push(TierEvent::PersistenceSkipped { tier });
                return;
            }
        };

        let outcome = persist_rows(
            session,
            project_id,
            report.executed,
            &report.rows,
            self.config.algorithms.persist_batch_size,
        )
        .await;
        report.persisted_rows = outcome.written;
        if let Some((batch, reason)) = outcome.failure {
            report.events.push(TierEvent::PersistenceFailed {
                batch,
                written: outcome.written,
                reason,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_graphs;
    use crate::fixtures;
    use axial_graph::backends::ACTIVE_RELATION_SCOPE;
    use axial_graph::probe::{GDS_PROBE, MAGE_PROBE};
    use axial_graph::testing::MockSession;
    use axial_graph::Record;
    use serde_json::json;
    use std::time::Duration;

    fn cache(force: Option<Tier>) -> ProbeCache {
        ProbeCache::new(Duration::ZERO, force)
    }

    fn gds_session() -> MockSession {
        MockSession::new()
            .respond(GDS_PROBE, vec![Record::new().with("version", "2.6.0")])
            .respond("gds.project", vec![Record::new().with("node_count", 2)])
            .respond(
                "gds.stream",
                vec![
                    Record::new().with("name", "b").with("labels", json!(["Code"])).with("score", 0.2),
                    Record::new().with("name", "a").with("labels", json!(["Code"])).with("score", 0.8),
                ],
            )
    }

    #[test]
    fn test_compute_in_process_orders_rows() {
        let rows = compute_in_process(
            &test_graphs::barbell(),
            AlgorithmName::CentralityBridging,
            &ResolvedParams::default(),
            10,
        );
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "d", "a", "b", "e", "f"]);
        assert_eq!(rows[0].labels, vec!["Code"]);
    }

    #[tokio::test]
    async fn test_in_process_run_without_native_store() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db));

        let report = runner
            .run(fixtures::PROJECT, AlgorithmName::Community, true, &AlgorithmParams::default())
            .await;
        assert_eq!(report.tier, Some(Tier::InProcess));
        assert!(!report.rows.is_empty());
        assert!(report.rows.iter().all(|r| r.name != "faith"));
        assert_eq!(report.events, vec![TierEvent::PersistenceSkipped { tier: Tier::InProcess }]);
        assert_eq!(report.persisted_rows, 0);
    }

    #[tokio::test]
    async fn test_gds_run_persists() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let session = gds_session();
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db).with_graph(&session));

        let report = runner
            .run("p1", AlgorithmName::CentralityInfluence, true, &AlgorithmParams::default())
            .await;
        assert_eq!(report.tier, Some(Tier::Gds));
        assert_eq!(report.rows[0].name, "a");
        assert_eq!(report.persisted_rows, 2);
        assert!(session.executed_names().contains(&"persist.batch"));
        assert!(session.seen()[2].cypher.contains(ACTIVE_RELATION_SCOPE));
    }

    #[tokio::test]
    async fn test_native_failure_downgrades_and_skips_persistence() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let session = gds_session().fail("gds.project");
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db).with_graph(&session));

        let report = runner
            .run(fixtures::PROJECT, AlgorithmName::CentralityBridging, true, &AlgorithmParams::default())
            .await;
        assert_eq!(report.tier, Some(Tier::InProcess));
        assert!(matches!(
            report.events[0],
            TierEvent::Downgrade { from: Tier::Gds, to: Tier::InProcess, .. }
        ));
        assert_eq!(report.events[1], TierEvent::PersistenceSkipped { tier: Tier::InProcess });
        assert!(!session.executed_names().contains(&"persist.batch"));
    }

    #[tokio::test]
    async fn test_refined_community_substituted_on_mage() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let session = MockSession::new()
            .respond(MAGE_PROBE, vec![Record::new().with("procedures", 3)])
            .respond(
                "mage.run",
                vec![Record::new().with("name", "a").with("labels", json!(["Code"])).with("community_id", 0)],
            );
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db).with_graph(&session));

        let report = runner
            .run("p1", AlgorithmName::CommunityRefined, false, &AlgorithmParams::default())
            .await;
        assert_eq!(report.tier, Some(Tier::Mage));
        assert_eq!(report.requested, AlgorithmName::CommunityRefined);
        assert_eq!(report.executed, AlgorithmName::Community);
        assert_eq!(
            report.events,
            vec![TierEvent::Substitution {
                requested: AlgorithmName::CommunityRefined,
                executed: AlgorithmName::Community,
                tier: Tier::Mage,
            }]
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_recorded() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let session = gds_session().fail("persist.batch");
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db).with_graph(&session));

        let report = runner
            .run("p1", AlgorithmName::CentralityInfluence, true, &AlgorithmParams::default())
            .await;
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.persisted_rows, 0);
        assert!(matches!(report.events[0], TierEvent::PersistenceFailed { batch: 0, written: 0, .. }));
    }

    #[tokio::test]
    async fn test_deterministic_output() {
        let db = fixtures::seeded_db();
        let config = EngineConfig::default();
        let probe = cache(None);
        let runner = AlgorithmRunner::new(&config, &probe, Stores::relational(&db));

        for algorithm in [
            AlgorithmName::Community,
            AlgorithmName::CommunityRefined,
            AlgorithmName::CentralityInfluence,
            AlgorithmName::CentralityBridging,
        ] {
            let first = runner.run(fixtures::PROJECT, algorithm, false, &AlgorithmParams::default()).await;
            let second = runner.run(fixtures::PROJECT, algorithm, false, &AlgorithmParams::default()).await;
            assert_eq!(
                serde_json::to_string(&first.rows).unwrap(),
                serde_json::to_string(&second.rows).unwrap()
            );
        }
    }
}
