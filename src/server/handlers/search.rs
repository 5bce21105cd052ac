//! Query endpoints for the two retrieval channels.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SemanticSearchRequest {
    pub query: String,
    pub limit: Option<usize>,
}

pub async fn semantic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SemanticSearchRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let limit = request.limit.unwrap_or(state.config.retrieval.top_k);
    let results = state.retriever.retrieve(&request.query, limit).await?;
    let count = results.len();
    Ok(Json(json!({
        "results": results,
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WebSearchRequest {
    pub query: String,
    pub max_results: Option<usize>,
}

pub async fn web(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WebSearchRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let max_results = request
        .max_results
        .unwrap_or(state.config.fallback.web_max_results);
    let results = state.web.retrieve(&request.query, max_results).await;
    let count = results.len();
    Ok(Json(json!({
        "results": results,
        "count": count,
    })))
}
