//! Semantic retrieval over the local vector index.

use std::sync::Arc;

use super::{SearchResult, SourceTag};
use crate::core::errors::RagError;
use crate::documents::ChunkLookup;
use crate::embed::Embedder;
use crate::index::VectorIndex;

/// Turns a query into ranked local chunks: one embedding call, one index
/// search, then id-to-text resolution through the document store.
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    lookup: Arc<dyn ChunkLookup>,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        lookup: Arc<dyn ChunkLookup>,
    ) -> Self {
        Self {
            embedder,
            index,
            lookup,
        }
    }

    /// Ranked local results for `query`. An empty index is a normal state
    /// and yields an empty list; an unreachable embedding backend is a
    /// required-path failure and surfaces as an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, k).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.lookup.chunk(&hit.id).await {
                Some(chunk) => results.push(SearchResult {
                    reference: chunk.id,
                    title: None,
                    text: chunk.text,
                    score: hit.score,
                    source: SourceTag::Local,
                }),
                // The chunk was deleted between the search and the lookup;
                // drop the hit rather than serving a dangling reference.
                None => {
                    tracing::debug!("Dropping hit for missing chunk {}", hit.id);
                }
            }
        }
        Ok(results)
    }
}
