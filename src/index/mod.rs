//! Vector index abstraction.
//!
//! Stores (vector, metadata) pairs keyed by id and answers nearest-neighbor
//! queries. The in-memory engine is the default so the pipeline runs with no
//! external services; the Qdrant adapter covers deployments with a running
//! instance. All co-resident vectors must share one dimension and one
//! embedding model id; the index learns both from the first upsert and
//! rejects anything else.

pub mod memory;
pub mod qdrant;

pub use memory::InMemoryVectorIndex;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::RagError;
use crate::embed::Embedding;

/// Dimension and model id shared by every vector in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub dimension: usize,
    pub model: String,
}

impl IndexSchema {
    pub fn of(embedding: &Embedding) -> Self {
        Self {
            dimension: embedding.dimension(),
            model: embedding.model.clone(),
        }
    }

    /// Reject an embedding that does not match this schema.
    pub fn check(&self, embedding: &Embedding) -> Result<(), RagError> {
        if embedding.dimension() != self.dimension || embedding.model != self.model {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.dimension(),
                expected_model: self.model.clone(),
                actual_model: embedding.model.clone(),
            });
        }
        Ok(())
    }
}

/// One search hit: an id and its similarity score (higher = more relevant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector stored under `id`. Atomic per id: a
    /// concurrent search sees either the old vector or the new one, never a
    /// partial write.
    async fn upsert(
        &self,
        id: &str,
        embedding: &Embedding,
        metadata: Option<Value>,
    ) -> Result<(), RagError>;

    async fn upsert_batch(
        &self,
        points: Vec<(String, Embedding, Option<Value>)>,
    ) -> Result<(), RagError> {
        for (id, embedding, metadata) in points {
            self.upsert(&id, &embedding, metadata).await?;
        }
        Ok(())
    }

    /// At most `k` results by descending score, ties broken by insertion
    /// order. An empty index returns an empty list, not an error.
    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredPoint>, RagError>;

    async fn delete(&self, id: &str) -> Result<(), RagError>;

    async fn delete_batch(&self, ids: &[String]) -> Result<(), RagError> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }

    /// Number of stored vectors.
    async fn size(&self) -> Result<usize, RagError>;
}

/// Cosine similarity over f32 slices, clamped to [-1, 1].
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}
