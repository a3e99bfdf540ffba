//! Native inputs for hidden-relationship discovery.
//!
//! Both queries return raw names; canonicalization and pairing happen in the
//! engine so native and relational paths count the same way.

use anyhow::Result;
use axial_core::NodeStatus;

use crate::session::{Column, CypherQuery, GraphSession};

pub const FRAGMENT_CODINGS: &str = "discovery.fragment_codings";
pub const CODE_COMMUNITIES: &str = "discovery.code_communities";

/// `(fragment_id, code_name)` for every coding in the project.
pub async fn fragment_codings(session: &dyn GraphSession, project_id: &str) -> Result<Vec<(String, String)>> {
    let query = CypherQuery::new(
        FRAGMENT_CODINGS,
        "MATCH (f:Fragment {project_id: $project_id})-[:CODED_AS]->(c:Code {project_id: $project_id})
         RETURN f.id AS fragment_id, c.name AS code_name
         ORDER BY fragment_id, code_name",
    )
    .param("project_id", project_id)
    .column("fragment_id", Column::Text)
    .column("code_name", Column::Text);

    let rows = session.query(query).await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.text("fragment_id"), row.text("code_name")))
        .filter(|(f, c)| !f.is_empty() && !c.is_empty())
        .collect())
}

/// A code's persisted community assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeCommunity {
    pub code_name: String,
    pub community_id: i64,
    pub status: NodeStatus,
}

/// Codes carrying a `community_id` written by a previous community run.
pub async fn code_communities(session: &dyn GraphSession, project_id: &str) -> Result<Vec<CodeCommunity>> {
    let query = CypherQuery::new(
        CODE_COMMUNITIES,
        "MATCH (c:Code {project_id: $project_id})
         WHERE c.community_id IS NOT NULL
         RETURN c.name AS code_name, c.community_id AS community_id,
                coalesce(c.status, 'active') AS status
         ORDER BY community_id, code_name",
    )
    .param("project_id", project_id)
    .column("code_name", Column::Text)
    .column("community_id", Column::Int)
    .column("status", Column::Text);

    let rows = session.query(query).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let community_id = row.int("community_id")?;
            let code_name = row.text("code_name");
            (!code_name.is_empty()).then(|| CodeCommunity {
                code_name,
                community_id,
                status: NodeStatus::parse_lenient(&row.text("status")),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Record;
    use crate::testing::MockSession;

    #[tokio::test]
    async fn test_code_communities_skip_incomplete_rows() {
        let session = MockSession::new().respond(
            CODE_COMMUNITIES,
            vec![
                Record::new().with("code_name", "a").with("community_id", 0).with("status", "active"),
                Record::new().with("code_name", "b"),
            ],
        );
        let communities = code_communities(&session, "p1").await.unwrap();
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].community_id, 0);
    }

    #[tokio::test]
    async fn test_fragment_codings() {
        let session = MockSession::new().respond(
            FRAGMENT_CODINGS,
            vec![
                Record::new().with("fragment_id", "f1").with("code_name", "a"),
                Record::new().with("fragment_id", "f1"),
            ],
        );
        let codings = fragment_codings(&session, "p1").await.unwrap();
        assert_eq!(codings, vec![("f1".to_string(), "a".to_string())]);
    }
}
