//! Ollama HTTP client for embedding generation.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;

/// Ollama embedding client.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            client,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text`, rejecting vectors of the wrong size.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to connect to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, body);
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        if result.embedding.len() != self.dimension {
            anyhow::bail!(
                "Model '{}' returned {} dimensions, expected {}",
                self.model,
                result.embedding.len(),
                self.dimension
            );
        }
        debug!(dim = result.embedding.len(), "Generated embedding");
        Ok(result.embedding)
    }

    /// Whether the service answers and lists the configured model.
    pub async fn health_check(&self) -> bool {
        match self.client.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(resp) if resp.status().is_success() => {
                let text = resp.text().await.unwrap_or_default();
                text.contains(&self.model)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = EmbeddingConfig {
            ollama_url: "http://ollama:11434/".to_string(),
            ..Default::default()
        };
        let client = OllamaClient::from_config(&config);
        assert_eq!(client.base_url, "http://ollama:11434");
        assert_eq!(client.dimension(), 768);
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest { model: "m", prompt: "hello" }).unwrap();
        assert_eq!(body, serde_json::json!({"model": "m", "prompt": "hello"}));
    }
}
