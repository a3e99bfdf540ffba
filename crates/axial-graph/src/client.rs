//! Neo4j connection client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::session::{Column, CypherQuery, GraphSession, Record};

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "axial_dev".to_string(),
            database: "neo4j".to_string(),
            max_connections: 8,
        }
    }
}

/// neo4rs-backed [`GraphSession`].
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// `Graph::connect` only builds a lazy pool, so a `RETURN 1` ping forces
    /// the bolt handshake and lets callers time out on an unreachable server.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(500)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        Ok(Self { graph })
    }

    /// Create a new GraphClient with default configuration.
    pub async fn connect_default() -> Result<Self> {
        Self::connect(&GraphConfig::default()).await
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

#[async_trait]
impl GraphSession for GraphClient {
    async fn query(&self, query: CypherQuery) -> Result<Vec<Record>> {
        debug!(query = query.name, "Running native query");
        let mut result = self
            .graph
            .execute(to_neo4j(&query))
            .await
            .with_context(|| format!("Neo4j query '{}' failed", query.name))?;

        let mut records = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .with_context(|| format!("Failed to read rows of '{}'", query.name))?
        {
            records.push(row_to_record(&row, &query.columns));
        }
        Ok(records)
    }

    async fn execute(&self, query: CypherQuery) -> Result<()> {
        debug!(query = query.name, "Running native statement");
        self.graph
            .run(to_neo4j(&query))
            .await
            .with_context(|| format!("Neo4j statement '{}' failed", query.name))?;
        Ok(())
    }
}

fn to_neo4j(query: &CypherQuery) -> Query {
    query
        .params
        .iter()
        .fold(Query::new(query.cypher.clone()), |q, (key, value)| {
            q.param(key.as_str(), to_bolt(value))
        })
}

/// Convert a JSON parameter to its bolt form.
///
/// No engine query passes maps; an object parameter is sent as JSON text.
fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => BoltType::from(s.clone()),
        Value::Array(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<BoltType>>()),
        Value::Object(_) => BoltType::from(value.to_string()),
    }
}

/// Pull the declared columns out of a row. Missing or null columns are left
/// out of the record.
fn row_to_record(row: &Row, columns: &[(&'static str, Column)]) -> Record {
    let mut record = Record::new();
    for (key, kind) in columns {
        let value: Option<Value> = match kind {
            Column::Text => row.get::<String>(key).ok().map(Value::from),
            Column::Int => row.get::<i64>(key).ok().map(Value::from),
            Column::Float => row
                .get::<f64>(key)
                .ok()
                .or_else(|| row.get::<i64>(key).ok().map(|i| i as f64))
                .map(Value::from),
            Column::TextList => row.get::<Vec<String>>(key).ok().map(Value::from),
            Column::Bool => row.get::<bool>(key).ok().map(Value::from),
        };
        if let Some(value) = value {
            record.insert(key, value);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.database, "neo4j");
    }

    #[test]
    fn test_to_bolt_scalars() {
        assert!(matches!(to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(to_bolt(&json!(3)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(&json!(0.5)), BoltType::Float(_)));
        assert!(matches!(to_bolt(&json!("x")), BoltType::String(_)));
        assert!(matches!(to_bolt(&json!(["a", "b"])), BoltType::List(_)));
        assert!(matches!(to_bolt(&json!({"k": 1})), BoltType::String(_)));
    }
}
