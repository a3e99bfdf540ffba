//! Computation backends, one per tier.
//!
//! The runner walks the available tiers best first and asks each backend in
//! turn. A backend either produces rows, reports that it does not support
//! the algorithm, or fails; failures hand the call to the next tier.

mod gds;
mod mage;

use anyhow::Result;
use async_trait::async_trait;
use axial_core::{AlgorithmName, AlgorithmRow, NodeType, ResolvedParams, Tier};

use crate::session::Record;

pub use gds::GdsBackend;
pub use mage::MageBackend;

#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    fn tier(&self) -> Tier;

    /// Whether the backend can run `algorithm` natively.
    fn supports(&self, algorithm: AlgorithmName) -> bool;

    async fn run(&self, project_id: &str, algorithm: AlgorithmName, params: &ResolvedParams) -> Result<Vec<AlgorithmRow>>;
}

/// Node filter for native algorithm inputs: tenant scope, coding-graph
/// labels, and merged aliases excluded.
pub const ACTIVE_RELATION_SCOPE: &str = "s.project_id = $project_id AND t.project_id = $project_id
         AND (s:Category OR s:Code) AND (t:Category OR t:Code)
         AND coalesce(s.status, 'active') <> 'merged'
         AND coalesce(t.status, 'active') <> 'merged'";

/// Map `name`/`labels`/`community_id`/`score` rows to algorithm rows.
///
/// Only the coding-graph label is kept so native and in-process rows look
/// the same.
pub(crate) fn parse_algorithm_rows(rows: Vec<Record>, algorithm: AlgorithmName) -> Vec<AlgorithmRow> {
    rows.into_iter()
        .filter_map(|row| {
            let name = row.text("name");
            if name.is_empty() {
                return None;
            }
            let labels = match NodeType::from_labels(&row.texts("labels")) {
                Some(t) => vec![t.label().to_string()],
                None => row.texts("labels"),
            };
            if algorithm.is_community() {
                row.int("community_id")
                    .map(|id| AlgorithmRow::community(name, labels, id))
            } else {
                Some(AlgorithmRow::scored(name, labels, row.float("score").unwrap_or(0.0)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_algorithm_rows() {
        let rows = vec![
            Record::new().with("name", "a").with("labels", json!(["Entity", "Code"])).with("community_id", 1),
            Record::new().with("name", "b").with("labels", json!(["Code"])),
            Record::new().with("labels", json!(["Code"])).with("community_id", 2),
        ];
        let parsed = parse_algorithm_rows(rows, AlgorithmName::Community);
        assert_eq!(parsed, vec![AlgorithmRow::community("a", vec!["Code".into()], 1)]);
    }

    #[test]
    fn test_parse_scores_default_to_zero() {
        let rows = vec![Record::new().with("name", "a").with("labels", json!(["Category"]))];
        let parsed = parse_algorithm_rows(rows, AlgorithmName::CentralityBridging);
        assert_eq!(parsed[0].score, Some(0.0));
    }
}
