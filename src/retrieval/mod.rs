//! Query-time retrieval.
//!
//! Two channels feed the fallback orchestrator: the semantic retriever over
//! the local vector index, and the web retriever over an external search
//! provider. Both produce `SearchResult`s; the source tag travels with each
//! result so provenance survives merging.

pub mod semantic;
pub mod web;

pub use semantic::SemanticRetriever;
pub use web::{TavilySearch, WebRetriever, WebSearch};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Local,
    Web,
}

/// One retrieved passage, from either channel. Ephemeral, produced per
/// query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk id for local results, URL for web results.
    pub reference: String,
    /// Page title for web results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    /// Similarity/relevance score; higher is more relevant.
    pub score: f32,
    pub source: SourceTag,
}
