//! Explicit relations between categories and codes.
//!
//! Endpoints are stored as node keys (`code:name`, `category:name`).

use rusqlite::params;
use tracing::warn;

use axial_core::{split_node_key, Edge, RelationType};

use crate::pool::{DbError, DbPool, DbResult};

/// Record a directed relation. Re-recording a pair replaces its type, evidence and memo.
pub fn insert_relation(pool: &DbPool, edge: &Edge) -> DbResult<()> {
    for key in [&edge.source_id, &edge.target_id] {
        if split_node_key(key).is_none() {
            return Err(DbError::InvalidRecord(format!("'{}' is not a node key", key)));
        }
    }
    let evidence = serde_json::to_string(&edge.evidence)?;

    pool.with_conn(|conn| {
        conn.execute(
            "INSERT OR REPLACE INTO relations
                (project_id, source_key, target_key, relation_type, evidence, memo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.project_id,
                edge.source_id,
                edge.target_id,
                edge.relation_type.as_str(),
                evidence,
                edge.memo,
            ],
        )?;
        Ok(())
    })
}

/// All relations of a project, ordered by endpoints.
pub fn list_relations(pool: &DbPool, project_id: &str) -> DbResult<Vec<Edge>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT project_id, source_key, target_key, relation_type, evidence, memo
             FROM relations WHERE project_id = ?1 ORDER BY source_key, target_key",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            let source_id: String = row.get(1)?;
            let target_id: String = row.get(2)?;
            let relation_type: String = row.get(3)?;
            let evidence: String = row.get(4)?;
            let evidence = parse_evidence(&source_id, &target_id, &evidence);
            Ok(Edge {
                project_id: row.get(0)?,
                source_id,
                target_id,
                relation_type: RelationType::parse_lenient(&relation_type),
                evidence,
                memo: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    })
}

/// Decode a stored evidence list. A corrupt column reads as no evidence.
fn parse_evidence(source_key: &str, target_key: &str, raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(source_key, target_key, error = %e, "Corrupt relation evidence, reading as empty");
        Vec::new()
    })
}
