//! Web retrieval channel.
//!
//! The web is the optional enrichment path: network failure, rate limiting,
//! an unconfigured provider, and timeouts all degrade to an empty result
//! list instead of an error, so a flaky provider can never take the query
//! pipeline down with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{SearchResult, SourceTag};
use crate::core::config::WebSearchConfig;
use crate::core::errors::RagError;

/// External search provider seam.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Whether the provider has what it needs (API key etc.) to be called.
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, RagError>;
}

/// Timeout-enforcing wrapper around a provider. This is what the
/// orchestrator talks to; it never fails, it only returns fewer results.
#[derive(Clone)]
pub struct WebRetriever {
    provider: Arc<dyn WebSearch>,
    timeout: Duration,
}

impl WebRetriever {
    pub fn new(provider: Arc<dyn WebSearch>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Web results for `query`, or an empty list on any failure. Latency is
    /// bounded by the configured timeout; an in-flight request past the
    /// deadline is dropped, not awaited.
    pub async fn retrieve(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        if !self.provider.is_configured() {
            tracing::debug!("Web search not configured, skipping");
            return Vec::new();
        }
        if max_results == 0 {
            return Vec::new();
        }

        match tokio::time::timeout(self.timeout, self.provider.search(query, max_results)).await {
            Ok(Ok(results)) => {
                tracing::info!("Web search completed: {} results", results.len());
                results
            }
            Ok(Err(err)) => {
                tracing::warn!("Web search failed: {}", err);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("Web search timed out after {:?}", self.timeout);
                Vec::new()
            }
        }
    }
}

/// Tavily search adapter.
pub struct TavilySearch {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl TavilySearch {
    pub fn new(config: &WebSearchConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        let url = format!("{}/search", self.endpoint);
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": "basic",
            "max_results": max_results,
            "include_answer": false,
            "include_raw_content": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::internal)?;

        if !response.status().is_success() {
            return Err(RagError::internal(format!(
                "tavily search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(RagError::internal)?;
        let items = payload
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::new();
        for item in items {
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = item.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let content = item.get("content").and_then(|v| v.as_str()).unwrap_or("");
            let score = item.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;

            if url.is_empty() || content.is_empty() {
                continue;
            }
            results.push(SearchResult {
                reference: url.to_string(),
                title: (!title.is_empty()).then(|| title.to_string()),
                text: content.to_string(),
                score,
                source: SourceTag::Web,
            });
        }
        Ok(results)
    }
}
