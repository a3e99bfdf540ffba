//! Semantic search collaborator.
//!
//! Used only as the last evidence source, after structural and co-occurrence
//! lookups came up short.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A fragment returned by semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentHit {
    pub fragment_id: String,
    pub score: f32,
    pub source_document: Option<String>,
    pub speaker_role: Option<String>,
    pub excerpt: Option<String>,
}

/// Ranked, tenant-scoped fragment search by free text.
#[async_trait]
pub trait SemanticFallback: Send + Sync {
    async fn search_fragments(&self, query: &str, project_id: &str, top_k: usize) -> Result<Vec<FragmentHit>>;
}
