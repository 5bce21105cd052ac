//! The full retrieve-and-generate endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::fallback::QueryOptions;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    pub max_results: Option<usize>,
    pub use_fallback: Option<bool>,
    pub force_web: Option<bool>,
}

pub async fn answer_with_fallback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let k = request.max_results.unwrap_or(state.config.retrieval.top_k);
    let opts = QueryOptions {
        use_fallback: request.use_fallback.unwrap_or(true),
        force_web: request.force_web.unwrap_or(false),
    };

    let outcome = state.orchestrator.run(&request.query, k, opts).await?;
    let answer = state
        .synthesizer
        .synthesize(&request.query, &outcome.context, outcome.mode)
        .await?;

    Ok(Json(json!({
        "query": request.query,
        "answer": answer.text,
        "mode": answer.mode,
        "decision": outcome.decision,
        "sources": answer.sources,
    })))
}
