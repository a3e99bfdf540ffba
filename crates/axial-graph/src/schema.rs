//! Neo4j schema initialization (constraints and indexes).

use anyhow::Result;
use tracing::info;

use crate::session::{CypherQuery, GraphSession};

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    // Tenant-scoped identity
    "CREATE CONSTRAINT code_identity IF NOT EXISTS FOR (c:Code) REQUIRE (c.project_id, c.name) IS UNIQUE",
    "CREATE CONSTRAINT category_identity IF NOT EXISTS FOR (c:Category) REQUIRE (c.project_id, c.name) IS UNIQUE",
    "CREATE CONSTRAINT fragment_identity IF NOT EXISTS FOR (f:Fragment) REQUIRE (f.project_id, f.id) IS UNIQUE",
    // Lookups used by extraction and discovery
    "CREATE INDEX code_status IF NOT EXISTS FOR (c:Code) ON (c.project_id, c.status)",
    "CREATE INDEX code_community IF NOT EXISTS FOR (c:Code) ON (c.project_id, c.community_id)",
    // Full-text search over fragment text
    "CREATE FULLTEXT INDEX fragment_search IF NOT EXISTS FOR (f:Fragment) ON EACH [f.text]",
];

/// Initialize Neo4j schema with constraints and indexes.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(session: &dyn GraphSession) -> Result<usize> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        session
            .execute(CypherQuery::new("schema.statement", *statement))
            .await?;
    }

    info!(statements = SCHEMA_STATEMENTS.len(), "Neo4j schema initialized");
    Ok(SCHEMA_STATEMENTS.len())
}
