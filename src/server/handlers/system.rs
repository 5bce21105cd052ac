//! Health and capability reporting.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::embed::Embedder;
use crate::index::VectorIndex;
use crate::state::AppState;
use crate::synthesis::Generator;

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Which backends are currently reachable. Probes run concurrently so a
/// dead backend slows this endpoint down by one timeout, not several.
pub async fn capabilities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (embedding_ok, generation_ok, index_size) = tokio::join!(
        state.embedder.health_check(),
        state.generator.health_check(),
        state.index.size(),
    );

    Ok(Json(json!({
        "embedding": {
            "reachable": embedding_ok,
            "model": state.embedder.model_id(),
        },
        "generation": {
            "reachable": generation_ok,
            "model": state.generator.model_id(),
        },
        "web_search": {
            "configured": state.web.is_configured(),
        },
        "index": {
            "engine": state.config.index.engine,
            "size": index_size.unwrap_or(0),
        },
    })))
}

pub async fn llm_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let reachable = state.generator.health_check().await;
    Ok(Json(json!({
        "reachable": reachable,
        "model": state.generator.model_id(),
        "endpoint": state.config.generation.endpoint,
    })))
}
