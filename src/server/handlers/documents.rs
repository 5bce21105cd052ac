//! Ingestion endpoints: upload, list, process, embed, store, delete.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::documents::{chunker, Chunk, Document};
use crate::embed::Embedder;
use crate::index::VectorIndex;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub text: String,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<Document>, ApiError> {
    let document = state
        .documents
        .insert(&request.filename, &request.text)
        .await?;
    Ok(Json(document))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let (documents, total) = state.documents.list(params.skip, params.limit).await;
    Ok(Json(json!({
        "documents": documents,
        "total": total,
        "skip": params.skip,
        "limit": params.limit,
    })))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state
        .documents
        .get(&doc_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id}")))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chunk_ids = state.documents.remove(&doc_id).await?;
    state.index.delete_batch(&chunk_ids).await?;
    Ok(Json(json!({
        "deleted": doc_id,
        "removed_chunks": chunk_ids.len(),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    pub chunk_size: Option<usize>,
    pub overlap: Option<usize>,
}

pub async fn process(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
    body: Option<Json<ProcessRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let chunk_size = request.chunk_size.unwrap_or(state.config.chunking.chunk_size);
    let overlap = request.overlap.unwrap_or(state.config.chunking.overlap);

    let document = state
        .documents
        .get(&doc_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id}")))?;

    let passages = chunker::chunk_text(&document.text, chunk_size, overlap)?;
    let chunks: Vec<Chunk> = passages
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk::new(&doc_id, ordinal, text))
        .collect();
    let chunk_count = chunks.len();

    // Reprocessing replaces the chunk set; stale vectors from a previous
    // pass must not keep answering queries.
    let stale_ids = state.documents.set_chunks(&doc_id, chunks).await?;
    state.index.delete_batch(&stale_ids).await?;

    tracing::info!("Document {} chunked into {} chunks", doc_id, chunk_count);
    Ok(Json(json!({
        "document_id": doc_id,
        "chunk_count": chunk_count,
        "chunk_size": chunk_size,
        "overlap": overlap,
    })))
}

pub async fn generate_embeddings(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chunks = state.documents.chunks(&doc_id).await?;
    if chunks.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "document {doc_id} has no chunks to embed"
        )));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = state.embedder.embed_batch(&texts).await?;

    let dimension = embeddings.first().map(|e| e.dimension()).unwrap_or(0);
    let count = embeddings.len();
    state.documents.set_embeddings(&doc_id, embeddings).await?;

    tracing::info!("Generated {} embeddings for document {}", count, doc_id);
    Ok(Json(json!({
        "document_id": doc_id,
        "embedding_count": count,
        "model": state.embedder.model_id(),
        "dimension": dimension,
    })))
}

pub async fn store(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pairs = state.documents.indexable_pairs(&doc_id).await?;

    let points = pairs
        .into_iter()
        .map(|(chunk, embedding)| {
            let metadata = json!({
                "document_id": chunk.document_id,
                "chunk_index": chunk.ordinal,
            });
            (chunk.id, embedding, Some(metadata))
        })
        .collect::<Vec<_>>();
    let stored = points.len();

    state.index.upsert_batch(points).await?;
    state.documents.mark_indexed(&doc_id).await?;

    let index_size = state.index.size().await?;
    tracing::info!("Stored {} vectors for document {}", stored, doc_id);
    Ok(Json(json!({
        "document_id": doc_id,
        "indexed_count": stored,
        "index_size": index_size,
    })))
}
