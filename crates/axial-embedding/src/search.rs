//! Semantic fragment search.
//!
//! Embeds a text query via Ollama, then searches the project's fragment
//! vectors in Qdrant.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axial_core::{Fragment, FragmentHit, SemanticFallback};
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::ollama::OllamaClient;
use crate::qdrant::FragmentIndex;

pub struct FragmentSearch {
    ollama: OllamaClient,
    index: FragmentIndex,
}

impl FragmentSearch {
    pub fn new(ollama: OllamaClient, index: FragmentIndex) -> Self {
        Self { ollama, index }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            ollama: OllamaClient::from_config(config),
            index: FragmentIndex::from_config(config)?,
        })
    }

    /// Embed and store fragments. Blank fragments are skipped; returns how
    /// many were indexed.
    pub async fn index_fragments(&self, fragments: &[Fragment]) -> Result<usize> {
        self.index.ensure_collection().await?;

        let mut indexed = 0;
        for fragment in fragments {
            if fragment.excerpt.trim().is_empty() {
                warn!(fragment = %fragment.id, "Skipping blank fragment");
                continue;
            }
            let vector = self
                .ollama
                .embed(&fragment.excerpt)
                .await
                .with_context(|| format!("Failed to embed fragment {}", fragment.id))?;
            self.index.upsert_fragment(fragment, vector).await?;
            indexed += 1;
        }
        debug!(indexed, total = fragments.len(), "Indexed fragments");
        Ok(indexed)
    }

    pub async fn remove_fragment(&self, project_id: &str, fragment_id: &str) -> Result<()> {
        self.index.delete_fragment(project_id, fragment_id).await
    }
}

#[async_trait]
impl SemanticFallback for FragmentSearch {
    async fn search_fragments(&self, query: &str, project_id: &str, top_k: usize) -> Result<Vec<FragmentHit>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .ollama
            .embed(query)
            .await
            .context("Failed to embed search query")?;

        debug!(query, project_id, dim = vector.len(), "Searching fragment vectors");

        self.index
            .search(project_id, vector, top_k as u64)
            .await
            .context("Failed to search Qdrant")
    }
}
