//! Ollama embedding adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Embedder, Embedding};
use crate::core::config::EmbeddingConfig;
use crate::core::errors::RagError;
use crate::core::retry::backoff_delay;

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
    max_retries: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            max_retries: config.max_retries,
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Embedding, RagError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::EmbeddingBackend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::EmbeddingBackend(format!(
                "embedding request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingBackend(e.to_string()))?;

        let vector: Vec<f32> = payload
            .get("embedding")
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_f64())
                    .map(|v| v as f32)
                    .collect()
            })
            .unwrap_or_default();

        if vector.is_empty() {
            return Err(RagError::EmbeddingBackend(
                "embedding response contained no vector".to_string(),
            ));
        }

        Ok(Embedding {
            vector,
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Embedding, RagError> {
        let mut attempt = 0;
        loop {
            match self.request_embedding(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(err) if attempt < self.max_retries => {
                    tracing::warn!(
                        "Embedding attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_retries,
                        err
                    );
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
