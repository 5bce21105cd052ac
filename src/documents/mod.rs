//! Document registry for the ingestion pipeline.
//!
//! Holds extracted document text and derived chunks in memory, tracking each
//! document through the `uploaded → chunked → embedded → indexed` lifecycle.
//! Raw file bytes are never stored here; the upload surface hands us text
//! that has already been extracted.

pub mod chunker;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::RagError;
use crate::embed::Embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Chunked,
    Embedded,
    Indexed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    /// Extracted text; not serialized into listings.
    #[serde(skip_serializing)]
    pub text: String,
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub chunk_count: usize,
}

/// A bounded text span derived from a document; the unit of retrieval.
/// Never mutated after creation, removed only when its document is deleted
/// or reprocessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub ordinal: usize,
    pub text: String,
    pub char_len: usize,
}

impl Chunk {
    pub fn new(document_id: &str, ordinal: usize, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            ordinal,
            char_len: text.chars().count(),
            text,
        }
    }
}

struct DocEntry {
    document: Document,
    chunks: Vec<Chunk>,
    embeddings: Vec<Embedding>,
}

#[derive(Default)]
struct Inner {
    docs: HashMap<String, DocEntry>,
    /// Upload order, for stable listing.
    order: Vec<String>,
    chunks_by_id: HashMap<String, Chunk>,
}

/// In-memory document store shared across queries and ingestion tasks.
#[derive(Clone, Default)]
pub struct DocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, filename: &str, text: &str) -> Result<Document, RagError> {
        if filename.trim().is_empty() {
            return Err(RagError::invalid("filename must not be empty"));
        }
        if text.trim().is_empty() {
            return Err(RagError::invalid("document text must not be empty"));
        }

        let document = Document {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            text: text.to_string(),
            content_hash: hex::encode(Sha256::digest(text.as_bytes())),
            uploaded_at: Utc::now(),
            status: DocumentStatus::Uploaded,
            chunk_count: 0,
        };

        let mut inner = self.inner.write().await;
        inner.order.push(document.id.clone());
        inner.docs.insert(
            document.id.clone(),
            DocEntry {
                document: document.clone(),
                chunks: Vec::new(),
                embeddings: Vec::new(),
            },
        );

        tracing::info!("Document uploaded: {} ({})", document.filename, document.id);
        Ok(document)
    }

    pub async fn list(&self, skip: usize, limit: usize) -> (Vec<Document>, usize) {
        let inner = self.inner.read().await;
        let total = inner.order.len();
        let docs = inner
            .order
            .iter()
            .skip(skip)
            .take(limit)
            .filter_map(|id| inner.docs.get(id))
            .map(|entry| entry.document.clone())
            .collect();
        (docs, total)
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        let inner = self.inner.read().await;
        inner.docs.get(id).map(|entry| entry.document.clone())
    }

    /// Remove a document. Returns the ids of its chunks so the caller can
    /// cascade the deletion into the vector index.
    pub async fn remove(&self, id: &str) -> Result<Vec<String>, RagError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .docs
            .remove(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;
        inner.order.retain(|doc_id| doc_id.as_str() != id);

        let chunk_ids: Vec<String> = entry.chunks.iter().map(|c| c.id.clone()).collect();
        for chunk_id in &chunk_ids {
            inner.chunks_by_id.remove(chunk_id);
        }
        tracing::info!(
            "Document removed: {} ({} chunks)",
            id,
            chunk_ids.len()
        );
        Ok(chunk_ids)
    }

    /// Replace a document's chunks and move it to `chunked`. Returns the ids
    /// of any previous chunks so stale index entries can be cleaned up.
    pub async fn set_chunks(&self, id: &str, chunks: Vec<Chunk>) -> Result<Vec<String>, RagError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;

        let old_ids: Vec<String> = entry.chunks.iter().map(|c| c.id.clone()).collect();
        entry.chunks = chunks.clone();
        entry.embeddings.clear();
        entry.document.status = DocumentStatus::Chunked;
        entry.document.chunk_count = chunks.len();

        for chunk_id in &old_ids {
            inner.chunks_by_id.remove(chunk_id);
        }
        for chunk in chunks {
            inner.chunks_by_id.insert(chunk.id.clone(), chunk);
        }
        Ok(old_ids)
    }

    /// Attach embeddings to a chunked document, one per chunk, in chunk
    /// ordinal order.
    pub async fn set_embeddings(
        &self,
        id: &str,
        embeddings: Vec<Embedding>,
    ) -> Result<(), RagError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;

        if entry.document.status < DocumentStatus::Chunked {
            return Err(RagError::invalid(format!(
                "document {id} has not been chunked yet"
            )));
        }
        if embeddings.len() != entry.chunks.len() {
            return Err(RagError::invalid(format!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                entry.chunks.len()
            )));
        }

        entry.embeddings = embeddings;
        entry.document.status = DocumentStatus::Embedded;
        Ok(())
    }

    /// Chunk/embedding pairs for the index upsert step, in ordinal order.
    pub async fn indexable_pairs(&self, id: &str) -> Result<Vec<(Chunk, Embedding)>, RagError> {
        let inner = self.inner.read().await;
        let entry = inner
            .docs
            .get(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;

        if entry.document.status < DocumentStatus::Embedded {
            return Err(RagError::invalid(format!(
                "document {id} has no embeddings to store"
            )));
        }
        Ok(entry
            .chunks
            .iter()
            .cloned()
            .zip(entry.embeddings.iter().cloned())
            .collect())
    }

    pub async fn mark_indexed(&self, id: &str) -> Result<(), RagError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;
        entry.document.status = DocumentStatus::Indexed;
        Ok(())
    }

    pub async fn chunks(&self, id: &str) -> Result<Vec<Chunk>, RagError> {
        let inner = self.inner.read().await;
        let entry = inner
            .docs
            .get(id)
            .ok_or_else(|| RagError::NotFound(format!("document {id}")))?;
        Ok(entry.chunks.clone())
    }
}

/// Maps raw index ids back to chunk text at query time.
#[async_trait]
pub trait ChunkLookup: Send + Sync {
    async fn chunk(&self, chunk_id: &str) -> Option<Chunk>;
}

#[async_trait]
impl ChunkLookup for DocumentStore {
    async fn chunk(&self, chunk_id: &str) -> Option<Chunk> {
        let inner = self.inner.read().await;
        inner.chunks_by_id.get(chunk_id).cloned()
    }
}
