use std::sync::Arc;
use std::time::Duration;

use crate::core::config::AppConfig;
use crate::core::errors::RagError;
use crate::documents::DocumentStore;
use crate::embed::{Embedder, OllamaEmbedder};
use crate::fallback::FallbackOrchestrator;
use crate::index::{InMemoryVectorIndex, QdrantIndex, VectorIndex};
use crate::retrieval::{SemanticRetriever, TavilySearch, WebRetriever};
use crate::synthesis::{AnswerSynthesizer, Generator, OllamaGenerator};

/// Shared application state: configuration plus the wired-up pipeline.
///
/// Every query is an independent unit of work; the only state shared across
/// concurrent requests is the vector index and the document registry, both
/// of which handle their own locking.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub documents: DocumentStore,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub index: Arc<dyn VectorIndex>,
    pub retriever: Arc<SemanticRetriever>,
    pub web: WebRetriever,
    pub orchestrator: FallbackOrchestrator,
    pub synthesizer: AnswerSynthesizer,
}

impl AppState {
    pub fn initialize(config: AppConfig) -> Result<Arc<Self>, RagError> {
        let config = Arc::new(config);

        let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(&config.embedding)?);
        let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(&config.generation)?);

        let index: Arc<dyn VectorIndex> = match config.index.engine.as_str() {
            "memory" => Arc::new(InMemoryVectorIndex::new()),
            "qdrant" => Arc::new(QdrantIndex::new(&config.index)?),
            other => {
                return Err(RagError::invalid(format!(
                    "unknown index engine '{other}' (expected 'memory' or 'qdrant')"
                )))
            }
        };

        let documents = DocumentStore::new();
        let retriever = Arc::new(SemanticRetriever::new(
            embedder.clone(),
            index.clone(),
            Arc::new(documents.clone()),
        ));

        let web = WebRetriever::new(
            Arc::new(TavilySearch::new(&config.web_search)?),
            Duration::from_secs(config.web_search.timeout_secs),
        );

        let orchestrator =
            FallbackOrchestrator::new(retriever.clone(), web.clone(), config.fallback.clone());
        let synthesizer =
            AnswerSynthesizer::new(generator.clone(), config.retrieval.max_context_chars);

        tracing::info!(
            "Pipeline initialized: index={} embedding={} generation={}",
            config.index.engine,
            config.embedding.model,
            config.generation.model
        );

        Ok(Arc::new(Self {
            config,
            documents,
            embedder,
            generator,
            index,
            retriever,
            web,
            orchestrator,
            synthesizer,
        }))
    }
}
