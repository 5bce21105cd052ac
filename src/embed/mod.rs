//! Embedding generation.
//!
//! `Embedder` is the capability interface over whatever embedding service is
//! configured; the pipeline never sees a concrete backend. Vectors carry the
//! model id that produced them so the index can refuse mixed-model data.

pub mod ollama;

pub use ollama::OllamaEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// A fixed-dimension vector plus the identifier of the model that produced
/// it. Query embeddings are ephemeral; chunk embeddings are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Stateless text-to-vector backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model in use.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Embedding, RagError>;

    /// Batch variant, order-preserving and equal in length to the input.
    /// Exists purely for throughput; results match calling `embed` per
    /// element. The default runs the scalar calls concurrently.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, RagError> {
        futures_util::future::try_join_all(texts.iter().map(|text| self.embed(text))).await
    }

    /// Whether the backend is currently reachable.
    async fn health_check(&self) -> bool;
}
