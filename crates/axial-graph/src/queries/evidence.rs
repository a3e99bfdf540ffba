//! Native fragment lookups for evidence packs.

use anyhow::Result;
use axial_core::Fragment;
use serde_json::json;

use crate::session::{Column, CypherQuery, GraphSession, Record};

pub const COOCCURRENCE_FRAGMENTS: &str = "evidence.cooccurrence_fragments";
pub const CONTRAST_FRAGMENTS: &str = "evidence.contrast_fragments";
pub const FRAGMENTS_BY_ID: &str = "evidence.fragments_by_id";

/// Fragments coded with a member of `left` and a member of `right`.
pub async fn cooccurrence_fragment_ids(
    session: &dyn GraphSession,
    project_id: &str,
    left: &[String],
    right: &[String],
    limit: usize,
) -> Result<Vec<String>> {
    let query = CypherQuery::new(
        COOCCURRENCE_FRAGMENTS,
        "MATCH (a:Code {project_id: $project_id})<-[:CODED_AS]-(f:Fragment {project_id: $project_id})
               -[:CODED_AS]->(b:Code {project_id: $project_id})
         WHERE a.name IN $left AND b.name IN $right
         RETURN DISTINCT f.id AS fragment_id
         ORDER BY fragment_id
         LIMIT $limit",
    )
    .param("project_id", project_id)
    .param("left", json!(left))
    .param("right", json!(right))
    .param("limit", limit as i64)
    .column("fragment_id", Column::Text);

    Ok(ids(session.query(query).await?))
}

/// Fragments coded with a member of `present` and with no member of `absent`.
pub async fn contrast_fragment_ids(
    session: &dyn GraphSession,
    project_id: &str,
    present: &[String],
    absent: &[String],
    limit: usize,
) -> Result<Vec<String>> {
    let query = CypherQuery::new(
        CONTRAST_FRAGMENTS,
        "MATCH (f:Fragment {project_id: $project_id})-[:CODED_AS]->(a:Code {project_id: $project_id})
         WHERE a.name IN $present
           AND NOT EXISTS {
             MATCH (f)-[:CODED_AS]->(b:Code {project_id: $project_id})
             WHERE b.name IN $absent
           }
         RETURN DISTINCT f.id AS fragment_id
         ORDER BY fragment_id
         LIMIT $limit",
    )
    .param("project_id", project_id)
    .param("present", json!(present))
    .param("absent", json!(absent))
    .param("limit", limit as i64)
    .column("fragment_id", Column::Text);

    Ok(ids(session.query(query).await?))
}

/// Fragment bodies for the given ids, in the requested order.
pub async fn fetch_fragments(session: &dyn GraphSession, project_id: &str, fragment_ids: &[String]) -> Result<Vec<Fragment>> {
    if fragment_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = CypherQuery::new(
        FRAGMENTS_BY_ID,
        "MATCH (f:Fragment {project_id: $project_id})
         WHERE f.id IN $ids
         RETURN f.id AS fragment_id, coalesce(f.source_document, '') AS source_document,
                coalesce(f.sequence_index, 0) AS sequence_index, f.speaker_role AS speaker_role,
                coalesce(f.text, '') AS excerpt",
    )
    .param("project_id", project_id)
    .param("ids", json!(fragment_ids))
    .column("fragment_id", Column::Text)
    .column("source_document", Column::Text)
    .column("sequence_index", Column::Int)
    .column("speaker_role", Column::Text)
    .column("excerpt", Column::Text);

    let mut fragments: Vec<Fragment> = session
        .query(query)
        .await?
        .into_iter()
        .filter(|row| !row.text("fragment_id").is_empty())
        .map(|row| Fragment {
            id: row.text("fragment_id"),
            project_id: project_id.to_string(),
            source_document: row.text("source_document"),
            sequence_index: row.int("sequence_index").unwrap_or(0),
            speaker_role: Some(row.text("speaker_role")).filter(|r| !r.is_empty()),
            excerpt: row.text("excerpt"),
        })
        .collect();

    fragments.sort_by_key(|f| fragment_ids.iter().position(|id| *id == f.id).unwrap_or(usize::MAX));
    Ok(fragments)
}

fn ids(rows: Vec<Record>) -> Vec<String> {
    rows.into_iter()
        .map(|row| row.text("fragment_id"))
        .filter(|id| !id.is_empty())
        .collect()
}
