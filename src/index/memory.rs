//! In-memory vector index.
//!
//! The default engine: a `RwLock`-guarded point list supporting concurrent
//! reads alongside exclusive writes. Upserts replace whole vectors under the
//! write lock, so a racing search observes either the old vector or the new
//! one. Search is an exact scan; at the document counts a single user's
//! corpus reaches, that is faster than maintaining an approximate structure.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{cosine_similarity, IndexSchema, ScoredPoint, VectorIndex};
use crate::core::errors::RagError;
use crate::embed::Embedding;

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    #[allow(dead_code)]
    metadata: Option<Value>,
}

#[derive(Default)]
struct Inner {
    schema: Option<IndexSchema>,
    /// Insertion order is preserved; search ties resolve to earlier points.
    points: Vec<StoredPoint>,
}

#[derive(Clone, Default)]
pub struct InMemoryVectorIndex {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        id: &str,
        embedding: &Embedding,
        metadata: Option<Value>,
    ) -> Result<(), RagError> {
        let mut inner = self.inner.write().await;

        match &inner.schema {
            Some(schema) => schema.check(embedding)?,
            None => inner.schema = Some(IndexSchema::of(embedding)),
        }

        match inner.points.iter().position(|p| p.id == id) {
            Some(pos) => {
                inner.points[pos].vector = embedding.vector.clone();
                inner.points[pos].metadata = metadata;
            }
            None => inner.points.push(StoredPoint {
                id: id.to_string(),
                vector: embedding.vector.clone(),
                metadata,
            }),
        }
        Ok(())
    }

    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredPoint>, RagError> {
        let inner = self.inner.read().await;

        if k == 0 || inner.points.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(schema) = &inner.schema {
            schema.check(query)?;
        }

        let mut results: Vec<ScoredPoint> = inner
            .points
            .iter()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(&query.vector, &point.vector),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<(), RagError> {
        let mut inner = self.inner.write().await;
        inner.points.retain(|p| p.id != id);
        Ok(())
    }

    async fn size(&self) -> Result<usize, RagError> {
        Ok(self.inner.read().await.points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(vector: Vec<f32>) -> Embedding {
        Embedding {
            vector,
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn search_returns_at_most_k_sorted_descending() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0, 0.0]), None).await.unwrap();
        index.upsert("b", &embedding(vec![0.9, 0.1]), None).await.unwrap();
        index.upsert("c", &embedding(vec![0.0, 1.0]), None).await.unwrap();

        let results = index.search(&embedding(vec![1.0, 0.0]), 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!(results[0].score >= results[1].score);

        let all = index.search(&embedding(vec![1.0, 0.0]), 10).await.unwrap();
        assert_eq!(all.len(), 3);
        for pair in all.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let index = InMemoryVectorIndex::new();
        index.upsert("first", &embedding(vec![1.0, 0.0]), None).await.unwrap();
        index.upsert("second", &embedding(vec![1.0, 0.0]), None).await.unwrap();

        let results = index.search(&embedding(vec![1.0, 0.0]), 2).await.unwrap();
        assert_eq!(results[0].id, "first");
        assert_eq!(results[1].id, "second");
    }

    #[tokio::test]
    async fn empty_index_returns_empty_not_error() {
        let index = InMemoryVectorIndex::new();
        let results = index.search(&embedding(vec![1.0, 0.0]), 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn k_zero_returns_empty() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0]), None).await.unwrap();
        let results = index.search(&embedding(vec![1.0]), 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0, 0.0]), None).await.unwrap();

        let err = index
            .search(&embedding(vec![1.0, 0.0, 0.0]), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));

        let err = index
            .upsert("b", &embedding(vec![1.0]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn model_mixing_is_rejected() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0, 0.0]), None).await.unwrap();

        let other_model = Embedding {
            vector: vec![0.5, 0.5],
            model: "other-model".to_string(),
        };
        let err = index.upsert("b", &other_model, None).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn deleted_ids_never_come_back() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0, 0.0]), None).await.unwrap();
        index.upsert("b", &embedding(vec![0.5, 0.5]), None).await.unwrap();

        index.delete("a").await.unwrap();
        assert_eq!(index.size().await.unwrap(), 1);

        let results = index.search(&embedding(vec![1.0, 0.0]), 5).await.unwrap();
        assert!(results.iter().all(|r| r.id != "a"));
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &embedding(vec![1.0, 0.0]), None).await.unwrap();
        index.upsert("a", &embedding(vec![0.0, 1.0]), None).await.unwrap();

        assert_eq!(index.size().await.unwrap(), 1);
        let results = index.search(&embedding(vec![0.0, 1.0]), 1).await.unwrap();
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }
}
