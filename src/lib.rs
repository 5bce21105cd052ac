//! Retrieval-augmented question answering over a user's documents and the
//! live web.
//!
//! Ingestion path: document text is chunked, embedded, and upserted into a
//! vector index. Query path: the query is embedded once, local chunks are
//! retrieved by similarity, the fallback orchestrator decides whether the
//! web channel is consulted, and the answer synthesizer turns the assembled
//! context into a grounded answer with provenance.
//!
//! Backends (embedding model, vector engine, web search provider, language
//! model) sit behind capability traits; adapters are swappable without
//! touching the orchestration logic.

pub mod core;
pub mod documents;
pub mod embed;
pub mod fallback;
pub mod index;
pub mod retrieval;
pub mod server;
pub mod state;
pub mod synthesis;
