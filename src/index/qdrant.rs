//! Qdrant REST adapter.
//!
//! Talks to a running Qdrant instance over its HTTP API: the collection is
//! created lazily on first upsert with cosine distance, and the model/
//! dimension schema is tracked locally so mixed-model writes fail before
//! they reach the server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{IndexSchema, ScoredPoint, VectorIndex};
use crate::core::config::IndexConfig;
use crate::core::errors::RagError;
use crate::embed::Embedding;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct QdrantIndex {
    base_url: String,
    collection: String,
    client: Client,
    schema: Mutex<Option<IndexSchema>>,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            client,
            schema: Mutex::new(None),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    /// Record the schema on first contact and create the collection if it
    /// does not exist yet.
    async fn ensure_collection(&self, embedding: &Embedding) -> Result<(), RagError> {
        let mut schema = self.schema.lock().await;
        if let Some(schema) = schema.as_ref() {
            return schema.check(embedding);
        }

        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(RagError::internal)?;

        if !response.status().is_success() {
            let body = json!({
                "vectors": {
                    "size": embedding.dimension(),
                    "distance": "Cosine",
                }
            });
            let created = self
                .client
                .put(self.collection_url())
                .json(&body)
                .send()
                .await
                .map_err(RagError::internal)?;
            if !created.status().is_success() {
                return Err(RagError::internal(format!(
                    "failed to create collection '{}': {}",
                    self.collection,
                    created.status()
                )));
            }
            tracing::info!("Created collection: {}", self.collection);
        }

        *schema = Some(IndexSchema::of(embedding));
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(
        &self,
        id: &str,
        embedding: &Embedding,
        metadata: Option<Value>,
    ) -> Result<(), RagError> {
        self.upsert_batch(vec![(id.to_string(), embedding.clone(), metadata)])
            .await
    }

    async fn upsert_batch(
        &self,
        points: Vec<(String, Embedding, Option<Value>)>,
    ) -> Result<(), RagError> {
        let Some((_, first, _)) = points.first() else {
            return Ok(());
        };
        self.ensure_collection(first).await?;

        {
            let schema = self.schema.lock().await;
            if let Some(schema) = schema.as_ref() {
                for (_, embedding, _) in &points {
                    schema.check(embedding)?;
                }
            }
        }

        let body = json!({
            "points": points
                .iter()
                .map(|(id, embedding, metadata)| {
                    json!({
                        "id": id,
                        "vector": embedding.vector,
                        "payload": metadata.clone().unwrap_or_else(|| json!({})),
                    })
                })
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(RagError::internal)?;

        if !response.status().is_success() {
            return Err(RagError::internal(format!(
                "qdrant upsert failed: {}",
                response.status()
            )));
        }
        tracing::debug!("Stored {} vectors in {}", points.len(), self.collection);
        Ok(())
    }

    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<ScoredPoint>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        {
            let schema = self.schema.lock().await;
            match schema.as_ref() {
                Some(schema) => schema.check(query)?,
                // Nothing stored through this handle yet; an absent
                // collection just means no results.
                None => {}
            }
        }

        let body = json!({
            "vector": query.vector,
            "limit": k,
            "with_payload": false,
        });

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(RagError::internal)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(RagError::internal(format!(
                "qdrant search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(RagError::internal)?;
        let hits = payload
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let id = match hit.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => continue,
            };
            let score = hit.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
            results.push(ScoredPoint { id, score });
        }
        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<(), RagError> {
        let ids = [id.to_string()];
        self.delete_batch(&ids).await
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<(), RagError> {
        if ids.is_empty() {
            return Ok(());
        }

        let body = json!({ "points": ids });
        let response = self
            .client
            .post(format!(
                "{}/points/delete?wait=true",
                self.collection_url()
            ))
            .json(&body)
            .send()
            .await
            .map_err(RagError::internal)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(RagError::internal(format!(
                "qdrant delete failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn size(&self) -> Result<usize, RagError> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url()))
            .json(&json!({ "exact": true }))
            .send()
            .await
            .map_err(RagError::internal)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !response.status().is_success() {
            return Err(RagError::internal(format!(
                "qdrant count failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(RagError::internal)?;
        Ok(payload
            .get("result")
            .and_then(|r| r.get("count"))
            .and_then(|c| c.as_u64())
            .unwrap_or(0) as usize)
    }
}
