//! Store-agnostic query contract.
//!
//! The engine never touches a driver directly. It builds named
//! [`CypherQuery`] values and hands them to whichever [`GraphSession`] the
//! caller lent it for the call. Query names are stable identifiers used for
//! logging and by the scripted test session.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Expected type of a returned column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Text,
    Int,
    Float,
    TextList,
    Bool,
}

/// A parameterized Cypher statement with its declared result columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    pub name: &'static str,
    pub cypher: String,
    pub params: BTreeMap<String, Value>,
    pub columns: Vec<(&'static str, Column)>,
}

impl CypherQuery {
    pub fn new(name: &'static str, cypher: impl Into<String>) -> Self {
        Self {
            name,
            cypher: cypher.into(),
            params: BTreeMap::new(),
            columns: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn column(mut self, key: &'static str, kind: Column) -> Self {
        self.columns.push((key, kind));
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// A string-list parameter, empty when absent or not a list.
    pub fn param_texts(&self, key: &str) -> Vec<String> {
        self.params
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Text column, empty when missing or null.
    pub fn text(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn texts(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// A native graph store session, owned by the caller for one call.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run a read query and collect its rows.
    async fn query(&self, query: CypherQuery) -> Result<Vec<Record>>;

    /// Run a statement that returns nothing of interest.
    async fn execute(&self, query: CypherQuery) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accessors() {
        let record = Record::new()
            .with("name", "trust")
            .with("score", 0.25)
            .with("community_id", 3)
            .with("labels", json!(["Code"]));
        assert_eq!(record.text("name"), "trust");
        assert_eq!(record.text("missing"), "");
        assert_eq!(record.float("score"), Some(0.25));
        assert_eq!(record.float("community_id"), Some(3.0));
        assert_eq!(record.int("community_id"), Some(3));
        assert_eq!(record.texts("labels"), vec!["Code"]);
    }

    #[test]
    fn test_query_builder() {
        let query = CypherQuery::new("test.query", "RETURN 1")
            .param("project_id", "p1")
            .param("codes", json!(["a", "b"]))
            .column("x", Column::Int);
        assert_eq!(query.param_value("project_id"), Some(&json!("p1")));
        assert_eq!(query.param_texts("codes"), vec!["a", "b"]);
        assert_eq!(query.columns, vec![("x", Column::Int)]);
    }
}
