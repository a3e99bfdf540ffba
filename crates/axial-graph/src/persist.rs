//! Batched write-back of algorithm results onto native nodes.
//!
//! Rows are written in fixed-size batches as parallel name/label/value
//! lists. A failed batch stops the write; batches already written stay.

use axial_core::{AlgorithmName, AlgorithmRow, NodeType};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::session::{CypherQuery, GraphSession};

pub const PERSIST_BATCH: &str = "persist.batch";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistOutcome {
    pub written: usize,
    pub batches: usize,
    /// `(batch index, reason)` of the batch that stopped the write.
    pub failure: Option<(usize, String)>,
}

/// Write each row's value to the algorithm's property on its node.
pub async fn persist_rows(
    session: &dyn GraphSession,
    project_id: &str,
    algorithm: AlgorithmName,
    rows: &[AlgorithmRow],
    batch_size: usize,
) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();
    let key = algorithm.property_key();
    let updated_at = Utc::now().to_rfc3339();

    for (index, batch) in rows.chunks(batch_size.max(1)).enumerate() {
        let names: Vec<&str> = batch.iter().map(|r| r.name.as_str()).collect();
        let labels: Vec<&str> = batch.iter().map(primary_label).collect();
        let values: Vec<Value> = batch
            .iter()
            .map(|r| match (r.community_id, r.score) {
                (Some(id), _) => json!(id),
                (None, Some(score)) => json!(score),
                (None, None) => Value::Null,
            })
            .collect();

        let query = CypherQuery::new(
            PERSIST_BATCH,
            format!(
                "UNWIND range(0, size($names) - 1) AS i
                 MATCH (n {{project_id: $project_id, name: $names[i]}})
                 WHERE $labels[i] IN labels(n)
                 SET n.{key} = $values[i], n.analytics_updated_at = $updated_at"
            ),
        )
        .param("project_id", project_id)
        .param("names", json!(names))
        .param("labels", json!(labels))
        .param("values", Value::Array(values))
        .param("updated_at", updated_at.as_str());

        match session.execute(query).await {
            Ok(()) => {
                outcome.written += batch.len();
                outcome.batches += 1;
                debug!(batch = index, rows = batch.len(), property = key, "Persisted batch");
            }
            Err(e) => {
                warn!(
                    batch = index,
                    written = outcome.written,
                    error = %e,
                    "Persistence batch failed, remaining batches skipped"
                );
                outcome.failure = Some((index, e.to_string()));
                break;
            }
        }
    }
    outcome
}

fn primary_label(row: &AlgorithmRow) -> &str {
    match NodeType::from_labels(&row.labels) {
        Some(t) => t.label(),
        None => row.labels.first().map(String::as_str).unwrap_or("Code"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSession;

    fn rows(n: usize) -> Vec<AlgorithmRow> {
        (0..n)
            .map(|i| AlgorithmRow::community(format!("c{}", i), vec!["Code".to_string()], (i % 2) as i64))
            .collect()
    }

    #[tokio::test]
    async fn test_batches() {
        let session = MockSession::new();
        let outcome = persist_rows(&session, "p1", AlgorithmName::Community, &rows(5), 2).await;
        assert_eq!(outcome.written, 5);
        assert_eq!(outcome.batches, 3);
        assert!(outcome.failure.is_none());

        let seen = session.seen();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].cypher.contains("n.community_id"));
        assert_eq!(seen[2].param_texts("names"), vec!["c4"]);
        assert_eq!(seen[0].param_value("values"), Some(&json!([0, 1])));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_batches() {
        let session = MockSession::new().fail(PERSIST_BATCH);
        let outcome = persist_rows(&session, "p1", AlgorithmName::CentralityInfluence, &rows(3), 1).await;
        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.failure.as_ref().map(|f| f.0), Some(0));
        assert_eq!(session.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_write() {
        let session = MockSession::new();
        let outcome = persist_rows(&session, "p1", AlgorithmName::Community, &[], 100).await;
        assert_eq!(outcome, PersistOutcome::default());
        assert!(session.seen().is_empty());
    }
}
