//! Connection settings for the embedding and vector services.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub ollama_url: String,
    pub model: String,
    /// Vector size produced by `model`.
    pub dimension: usize,
    pub qdrant_url: String,
    pub collection: String,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "axial_fragments".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let config: EmbeddingConfig = serde_json::from_str(r#"{"model": "mxbai-embed-large", "dimension": 1024}"#).unwrap();
        assert_eq!(config.model, "mxbai-embed-large");
        assert_eq!(config.dimension, 1024);
        assert_eq!(config.collection, "axial_fragments");
    }
}
