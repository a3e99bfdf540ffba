//! # Axial Graph
//!
//! Neo4j integration for Axial.
//!
//! Provides the `GraphSession` contract the engine talks to, a neo4rs-backed
//! client, capability probing for the analytics extensions, native extraction
//! and evidence queries, the native algorithm tiers and batched persistence.

pub mod backends;
pub mod client;
pub mod persist;
pub mod probe;
pub mod queries;
pub mod schema;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backends::{AnalyticsBackend, GdsBackend, MageBackend};
pub use client::{GraphClient, GraphConfig};
pub use persist::{persist_rows, PersistOutcome};
pub use probe::{CapabilityReport, ProbeCache};
pub use session::{Column, CypherQuery, GraphSession, Record};
