//! # Axial Analytics
//!
//! Graph analytics and evidence-backed relationship discovery over a
//! multi-tenant coding graph.
//!
//! [`AnalyticsEngine`] is the entry point. Each call borrows the caller's
//! stores through [`Stores`], detects the best computation tier, extracts a
//! canonicalized graph when it needs one, and returns ordered results.
//! Store failures downgrade or empty the result; only invalid caller input
//! is returned as an error.

pub mod algorithms;
pub mod clustering;
pub mod discovery;
pub mod engine;
pub mod evidence;
pub mod extractor;
pub mod link_prediction;
pub mod runner;

pub use discovery::HiddenRelationshipDiscoverer;
pub use engine::{AnalyticsEngine, Stores};
pub use evidence::EvidencePackBuilder;
pub use extractor::{EdgeOrigin, ExtractedGraph, GraphExtractor, GraphSource};
pub use link_prediction::{Heuristic, LinkPredictor};
pub use runner::AlgorithmRunner;

#[cfg(test)]
pub(crate) mod fixtures;
