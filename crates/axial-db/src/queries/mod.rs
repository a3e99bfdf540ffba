//! Tenant-scoped relational queries.

pub mod assignments;
pub mod codes;
pub mod fragments;
pub mod relations;

use rusqlite::types::Value;

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn text_values(items: &[String]) -> impl Iterator<Item = Value> + '_ {
    items.iter().map(|s| Value::Text(s.clone()))
}
