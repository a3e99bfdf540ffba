//! Native extraction of the coding graph's relation edges.

use anyhow::Result;
use axial_core::{NodeStatus, RelationType};

use super::RELATION_SCOPE;
use crate::session::{Column, CypherQuery, GraphSession, Record};

pub const RELATION_EDGES: &str = "extract.relation_edges";

/// One directed relation as stored natively, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEdgeRow {
    pub source_name: String,
    pub source_labels: Vec<String>,
    pub source_status: NodeStatus,
    pub target_name: String,
    pub target_labels: Vec<String>,
    pub target_status: NodeStatus,
    pub relation_type: RelationType,
}

/// Every `RELATES_TO` edge between categories and codes of a project.
pub async fn fetch_relation_edges(session: &dyn GraphSession, project_id: &str) -> Result<Vec<NativeEdgeRow>> {
    let query = CypherQuery::new(
        RELATION_EDGES,
        format!(
            "MATCH (s)-[r:RELATES_TO]->(t)
             WHERE {RELATION_SCOPE}
             RETURN s.name AS source_name, labels(s) AS source_labels,
                    coalesce(s.status, 'active') AS source_status,
                    t.name AS target_name, labels(t) AS target_labels,
                    coalesce(t.status, 'active') AS target_status,
                    coalesce(r.relation_type, 'associative') AS relation_type
             ORDER BY source_name, target_name"
        ),
    )
    .param("project_id", project_id)
    .column("source_name", Column::Text)
    .column("source_labels", Column::TextList)
    .column("source_status", Column::Text)
    .column("target_name", Column::Text)
    .column("target_labels", Column::TextList)
    .column("target_status", Column::Text)
    .column("relation_type", Column::Text);

    Ok(parse_edge_rows(session.query(query).await?))
}

fn parse_edge_rows(rows: Vec<Record>) -> Vec<NativeEdgeRow> {
    rows.into_iter()
        .map(|row| NativeEdgeRow {
            source_name: row.text("source_name"),
            source_labels: row.texts("source_labels"),
            source_status: NodeStatus::parse_lenient(&row.text("source_status")),
            target_name: row.text("target_name"),
            target_labels: row.texts("target_labels"),
            target_status: NodeStatus::parse_lenient(&row.text("target_status")),
            relation_type: RelationType::parse_lenient(&row.text("relation_type")),
        })
        .filter(|edge| !edge.source_name.is_empty() && !edge.target_name.is_empty())
        .collect()
}
