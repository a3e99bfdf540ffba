//! Scripted in-memory [`GraphSession`] for tests.
//!
//! Responses are keyed by query name. Unscripted queries return no rows, so a
//! bare `MockSession::new()` behaves like an empty but healthy store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::session::{CypherQuery, GraphSession, Record};

type Responder = Box<dyn Fn(&CypherQuery) -> Vec<Record> + Send + Sync>;

#[derive(Default)]
pub struct MockSession {
    responders: HashMap<&'static str, Responder>,
    failures: HashSet<String>,
    fail_all: bool,
    seen: Mutex<Vec<CypherQuery>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose every call fails, like an unreachable server.
    pub fn unreachable() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Answer `name` with fixed rows.
    pub fn respond(self, name: &'static str, rows: Vec<Record>) -> Self {
        self.respond_with(name, move |_| rows.clone())
    }

    /// Answer `name` with rows computed from the query parameters.
    pub fn respond_with<F>(mut self, name: &'static str, responder: F) -> Self
    where
        F: Fn(&CypherQuery) -> Vec<Record> + Send + Sync + 'static,
    {
        self.responders.insert(name, Box::new(responder));
        self
    }

    /// Make every query or statement named `name` fail.
    pub fn fail(mut self, name: &str) -> Self {
        self.failures.insert(name.to_string());
        self
    }

    /// Every query and statement received, in order.
    pub fn seen(&self) -> Vec<CypherQuery> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Names of everything received, in order.
    pub fn executed_names(&self) -> Vec<&'static str> {
        self.seen().iter().map(|q| q.name).collect()
    }

    fn receive(&self, query: &CypherQuery) -> Result<()> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.clone());
        }
        if self.fail_all || self.failures.contains(query.name) {
            return Err(anyhow!("scripted failure for '{}'", query.name));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphSession for MockSession {
    async fn query(&self, query: CypherQuery) -> Result<Vec<Record>> {
        self.receive(&query)?;
        Ok(self
            .responders
            .get(query.name)
            .map(|respond| respond(&query))
            .unwrap_or_default())
    }

    async fn execute(&self, query: CypherQuery) -> Result<()> {
        self.receive(&query)
    }
}
