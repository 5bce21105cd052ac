//! Application configuration.
//!
//! Loaded once at startup from an optional TOML file plus environment
//! overrides, then passed into constructors. Nothing here is mutable
//! process-wide state.

use std::path::Path;

use serde::Deserialize;

use crate::core::errors::RagError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub fallback: FallbackConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub web_search: WebSearchConfig,
    pub index: IndexConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            fallback: FallbackConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            web_search: WebSearchConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_dir: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of results per query.
    pub top_k: usize,
    /// Character budget for the prompt context.
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_chars: 2000,
        }
    }
}

/// Knobs for the per-query fallback decision.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Local result count below which the web channel is considered.
    pub min_local_results: usize,
    /// Additive score bonus given to local results when merging with web
    /// results, so grounded content outranks the less-trusted web channel.
    pub local_boost: f32,
    /// Maximum results requested from the web channel.
    pub web_max_results: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_local_results: 1,
            local_boost: 0.15,
            web_max_results: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "gemma:2b".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Budget for one whole web attempt; on expiry the attempt yields
    /// empty results instead of an error.
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// "memory" or "qdrant".
    pub engine: String,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            engine: "memory".to_string(),
            qdrant_url: "http://localhost:6333".to_string(),
            collection: "documents".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file if it exists, then apply
    /// environment overrides. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(RagError::internal)?;
                toml::from_str(&raw)
                    .map_err(|e| RagError::invalid(format!("config parse error: {e}")))?
            }
            _ => AppConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("RAGDESK_OLLAMA_URL") {
            self.embedding.endpoint = url.clone();
            self.generation.endpoint = url;
        }
        if let Ok(url) = std::env::var("RAGDESK_QDRANT_URL") {
            self.index.qdrant_url = url;
        }
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            self.web_search.api_key = key;
        }
    }
}
