//! End-to-end pipeline tests over in-process mock backends.
//!
//! These exercise the library surface the same way the HTTP handlers do:
//! ingest a document through chunking, embedding, and indexing, then drive
//! queries through the fallback orchestrator and synthesizer.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use ragdesk_backend::core::config::FallbackConfig;
use ragdesk_backend::core::errors::RagError;
use ragdesk_backend::documents::{chunker, Chunk, DocumentStore};
use ragdesk_backend::embed::{Embedder, Embedding};
use ragdesk_backend::fallback::{
    FallbackOrchestrator, FallbackRoute, QueryOptions, SourceMode,
};
use ragdesk_backend::index::{InMemoryVectorIndex, VectorIndex};
use ragdesk_backend::retrieval::{
    SearchResult, SemanticRetriever, SourceTag, WebRetriever, WebSearch,
};
use ragdesk_backend::synthesis::{AnswerSynthesizer, Generator};

// ---------------------------------------------------------------------------
// Mock backends
// ---------------------------------------------------------------------------

/// Deterministic toy embedding: a positional character histogram. Identical
/// text always maps to the identical vector, so an exact-match query scores
/// a perfect cosine of 1.0 against its own chunk.
fn toy_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 16];
    for (i, byte) in text.bytes().enumerate() {
        vector[(byte as usize + i) % 16] += 1.0;
    }
    vector
}

struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_id(&self) -> &str {
        "mock-embed"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, RagError> {
        Ok(Embedding {
            vector: toy_embedding(text),
            model: "mock-embed".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing-embed"
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, RagError> {
        Err(RagError::EmbeddingBackend("connection refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct MockGenerator {
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn model_id(&self) -> &str {
        "mock-gen"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("generated answer".to_string())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Scripted web provider: fixed results, a hard failure, or a hang that
/// only the retriever's timeout can end.
enum WebBehavior {
    Results(Vec<SearchResult>),
    Fail,
    Hang,
}

struct ScriptedWeb {
    behavior: WebBehavior,
    calls: Mutex<usize>,
}

impl ScriptedWeb {
    fn new(behavior: WebBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(0),
        })
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl WebSearch for ScriptedWeb {
    fn is_configured(&self) -> bool {
        true
    }

    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        *self.calls.lock().unwrap() += 1;
        match &self.behavior {
            WebBehavior::Results(results) => Ok(results.clone()),
            WebBehavior::Fail => Err(RagError::internal("rate limited")),
            WebBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }
    }
}

fn web_result(url: &str, score: f32) -> SearchResult {
    SearchResult {
        reference: url.to_string(),
        title: Some("Result page".to_string()),
        text: format!("snippet from {url}"),
        score,
        source: SourceTag::Web,
    }
}

// ---------------------------------------------------------------------------
// Pipeline wiring helpers
// ---------------------------------------------------------------------------

struct Pipeline {
    documents: DocumentStore,
    index: InMemoryVectorIndex,
    retriever: Arc<SemanticRetriever>,
}

fn build_pipeline() -> Pipeline {
    let documents = DocumentStore::new();
    let index = InMemoryVectorIndex::new();
    let retriever = Arc::new(SemanticRetriever::new(
        Arc::new(MockEmbedder),
        Arc::new(index.clone()),
        Arc::new(documents.clone()),
    ));
    Pipeline {
        documents,
        index,
        retriever,
    }
}

fn orchestrator(
    pipeline: &Pipeline,
    web: Arc<ScriptedWeb>,
    web_timeout: Duration,
    config: FallbackConfig,
) -> FallbackOrchestrator {
    FallbackOrchestrator::new(
        pipeline.retriever.clone(),
        WebRetriever::new(web, web_timeout),
        config,
    )
}

/// Run a document through the whole ingestion path, mirroring the handler
/// sequence: upload, chunk, embed, store.
async fn ingest(
    pipeline: &Pipeline,
    filename: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    let embedder = MockEmbedder;

    let document = pipeline.documents.insert(filename, text).await.unwrap();
    let passages = chunker::chunk_text(text, chunk_size, overlap).unwrap();
    let chunks: Vec<Chunk> = passages
        .into_iter()
        .enumerate()
        .map(|(ordinal, passage)| Chunk::new(&document.id, ordinal, passage))
        .collect();
    pipeline
        .documents
        .set_chunks(&document.id, chunks.clone())
        .await
        .unwrap();

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await.unwrap();
    pipeline
        .documents
        .set_embeddings(&document.id, embeddings)
        .await
        .unwrap();

    let pairs = pipeline
        .documents
        .indexable_pairs(&document.id)
        .await
        .unwrap();
    let points = pairs
        .into_iter()
        .map(|(chunk, embedding)| (chunk.id, embedding, None))
        .collect();
    pipeline.index.upsert_batch(points).await.unwrap();
    pipeline.documents.mark_indexed(&document.id).await.unwrap();

    chunks
}

// ---------------------------------------------------------------------------
// Ingestion and semantic search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_short_document_flows_through_the_pipeline() {
    let pipeline = build_pipeline();

    let chunks = ingest(
        &pipeline,
        "sky.txt",
        "The sky is blue. Grass is green.",
        500,
        50,
    )
    .await;
    assert_eq!(chunks.len(), 1, "short text should produce exactly one chunk");
    assert_eq!(pipeline.index.size().await.unwrap(), 1);

    let results = pipeline
        .retriever
        .retrieve("color of sky", 3)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, SourceTag::Local);
    assert_eq!(results[0].reference, chunks[0].id);
    assert!(results[0].score > 0.0);
    assert!(results[0].text.contains("The sky is blue"));
}

#[tokio::test]
async fn chunk_text_queried_verbatim_ranks_its_own_chunk_first() {
    let pipeline = build_pipeline();

    ingest(&pipeline, "a.txt", "Rust ownership prevents data races.", 500, 0).await;
    let target = ingest(&pipeline, "b.txt", "Tokio schedules asynchronous tasks.", 500, 0).await;

    let results = pipeline
        .retriever
        .retrieve("Tokio schedules asynchronous tasks.", 5)
        .await
        .unwrap();

    assert_eq!(results[0].reference, target[0].id);
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn empty_index_query_returns_empty_not_error() {
    let pipeline = build_pipeline();
    let results = pipeline.retriever.retrieve("anything", 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn embedder_outage_surfaces_on_the_query_path() {
    let documents = DocumentStore::new();
    let index = InMemoryVectorIndex::new();
    let retriever = SemanticRetriever::new(
        Arc::new(FailingEmbedder),
        Arc::new(index),
        Arc::new(documents),
    );

    let err = retriever.retrieve("anything", 5).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingBackend(_)));
}

// ---------------------------------------------------------------------------
// Fallback orchestration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_local_with_fallback_merges_web_results() {
    let pipeline = build_pipeline();
    let web = ScriptedWeb::new(WebBehavior::Results(vec![
        web_result("https://example.com/a", 0.8),
        web_result("https://example.com/b", 0.6),
    ]));
    let orchestrator = orchestrator(
        &pipeline,
        web,
        Duration::from_secs(1),
        FallbackConfig::default(),
    );

    // Same inputs, same terminal state, every time.
    for _ in 0..3 {
        let outcome = orchestrator
            .run(
                "anything",
                5,
                QueryOptions {
                    use_fallback: true,
                    force_web: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.mode, SourceMode::WebMerged);
        assert_eq!(outcome.decision.route, FallbackRoute::WebOnly);
        assert_eq!(outcome.context.len(), 2);
        assert!(outcome.context.iter().all(|r| r.source == SourceTag::Web));
        assert!(outcome.context[0].score >= outcome.context[1].score);
    }
}

#[tokio::test]
async fn satisfied_local_never_touches_the_web() {
    let pipeline = build_pipeline();
    ingest(&pipeline, "doc.txt", "Local knowledge lives here.", 500, 0).await;

    let web = ScriptedWeb::new(WebBehavior::Results(vec![web_result(
        "https://example.com",
        0.9,
    )]));
    let orchestrator = orchestrator(
        &pipeline,
        web.clone(),
        Duration::from_secs(1),
        FallbackConfig::default(),
    );

    let outcome = orchestrator
        .run(
            "local knowledge",
            5,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.mode, SourceMode::LocalSatisfied);
    assert_eq!(outcome.decision.route, FallbackRoute::LocalOnly);
    assert_eq!(web.call_count(), 0);
}

#[tokio::test]
async fn web_timeout_degrades_to_local_within_the_deadline() {
    let pipeline = build_pipeline();
    ingest(&pipeline, "doc.txt", "One thin local result.", 500, 0).await;

    let config = FallbackConfig {
        // Force the web attempt by demanding more local results than exist.
        min_local_results: 2,
        ..FallbackConfig::default()
    };
    let web = ScriptedWeb::new(WebBehavior::Hang);
    let orchestrator = orchestrator(&pipeline, web, Duration::from_millis(100), config);

    let started = Instant::now();
    let outcome = orchestrator
        .run(
            "thin local",
            5,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(2),
        "latency must be bounded by local search time plus the web timeout"
    );
    assert_eq!(outcome.mode, SourceMode::DegradedLocal);
    assert_eq!(outcome.context.len(), 1);
    assert_eq!(outcome.context[0].source, SourceTag::Local);
}

#[tokio::test]
async fn web_failure_with_no_local_results_ends_empty() {
    let pipeline = build_pipeline();
    let web = ScriptedWeb::new(WebBehavior::Fail);
    let orchestrator = orchestrator(
        &pipeline,
        web,
        Duration::from_secs(1),
        FallbackConfig::default(),
    );

    let outcome = orchestrator
        .run(
            "anything",
            5,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.mode, SourceMode::Empty);
    assert!(outcome.context.is_empty());
}

#[tokio::test]
async fn local_boost_is_read_from_configuration() {
    let pipeline = build_pipeline();
    ingest(&pipeline, "doc.txt", "Grounded content beats snippets.", 500, 0).await;

    // Web result scores above the local one; a large configured boost must
    // still put the local passage first in the merged ranking.
    let config = FallbackConfig {
        min_local_results: 2,
        local_boost: 10.0,
        ..FallbackConfig::default()
    };
    let web = ScriptedWeb::new(WebBehavior::Results(vec![web_result(
        "https://example.com",
        0.99,
    )]));
    let orchestrator = orchestrator(&pipeline, web, Duration::from_secs(1), config);

    let outcome = orchestrator
        .run(
            "grounded content",
            5,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.mode, SourceMode::WebMerged);
    assert_eq!(outcome.context[0].source, SourceTag::Local);
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn answer_carries_local_provenance_and_mode() {
    let pipeline = build_pipeline();
    ingest(&pipeline, "doc.txt", "The sky is blue. Grass is green.", 500, 0).await;

    let web = ScriptedWeb::new(WebBehavior::Fail);
    let orchestrator = orchestrator(
        &pipeline,
        web,
        Duration::from_secs(1),
        FallbackConfig::default(),
    );
    let generator = Arc::new(MockGenerator::default());
    let generator_dyn: Arc<dyn Generator> = generator.clone();
    let synthesizer = AnswerSynthesizer::new(generator_dyn, 2000);

    let outcome = orchestrator
        .run(
            "color of sky",
            3,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();
    let answer = synthesizer
        .synthesize("color of sky", &outcome.context, outcome.mode)
        .await
        .unwrap();

    assert_eq!(answer.mode, SourceMode::LocalSatisfied);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].source, SourceTag::Local);
    assert_eq!(answer.text, "generated answer");

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("Context information"));
    assert!(prompt.contains("The sky is blue"));
}

#[tokio::test]
async fn empty_outcome_tells_the_model_there_is_no_grounding() {
    let pipeline = build_pipeline();
    let web = ScriptedWeb::new(WebBehavior::Fail);
    let orchestrator = orchestrator(
        &pipeline,
        web,
        Duration::from_secs(1),
        FallbackConfig::default(),
    );
    let generator = Arc::new(MockGenerator::default());
    let generator_dyn: Arc<dyn Generator> = generator.clone();
    let synthesizer = AnswerSynthesizer::new(generator_dyn, 2000);

    let outcome = orchestrator
        .run(
            "unanswerable",
            3,
            QueryOptions {
                use_fallback: true,
                force_web: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.mode, SourceMode::Empty);

    let answer = synthesizer
        .synthesize("unanswerable", &outcome.context, outcome.mode)
        .await
        .unwrap();

    assert!(answer.sources.is_empty());
    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("No supporting documents"));
    assert!(!prompt.contains("Context information"));
}

// ---------------------------------------------------------------------------
// Document deletion cascade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_a_document_removes_it_from_search() {
    let pipeline = build_pipeline();
    let chunks = ingest(&pipeline, "doc.txt", "Ephemeral knowledge.", 500, 0).await;
    let doc_id = chunks[0].document_id.clone();

    assert_eq!(pipeline.index.size().await.unwrap(), 1);

    let removed = pipeline.documents.remove(&doc_id).await.unwrap();
    pipeline.index.delete_batch(&removed).await.unwrap();

    assert_eq!(pipeline.index.size().await.unwrap(), 0);
    let results = pipeline
        .retriever
        .retrieve("ephemeral knowledge", 5)
        .await
        .unwrap();
    assert!(results.is_empty());
}
