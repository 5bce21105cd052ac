//! Ollama generation adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::Generator;
use crate::core::config::GenerationConfig;
use crate::core::errors::RagError;
use crate::core::retry::backoff_delay;

pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: Client,
    max_retries: usize,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
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

    async fn request_generation(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::GenerationBackend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::GenerationBackend(format!(
                "generation request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RagError::GenerationBackend(e.to_string()))?;

        Ok(payload
            .get("response")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let mut attempt = 0;
        loop {
            match self.request_generation(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.max_retries => {
                    tracing::warn!(
                        "Generation attempt {}/{} failed: {}",
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
