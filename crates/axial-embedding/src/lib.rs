//! # Axial Embedding
//!
//! Fragment embeddings via Ollama and semantic fragment search via Qdrant.
//!
//! [`FragmentSearch`] is the production [`axial_core::SemanticFallback`]
//! used as the last evidence source.

pub mod config;
pub mod ollama;
pub mod qdrant;
pub mod search;

pub use config::EmbeddingConfig;
pub use ollama::OllamaClient;
pub use qdrant::FragmentIndex;
pub use search::FragmentSearch;
