use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{documents, rag, search, system};
use crate::state::AppState;

/// Builds the application router: ingestion, query, and status surfaces
/// under `/api/v1`, plus a bare health endpoint for container probes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(system::health))
        .route("/api/v1/documents/upload", post(documents::upload))
        .route("/api/v1/documents", get(documents::list))
        .route(
            "/api/v1/documents/:doc_id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/api/v1/documents/:doc_id/process", post(documents::process))
        .route(
            "/api/v1/documents/:doc_id/embeddings",
            post(documents::generate_embeddings),
        )
        .route("/api/v1/documents/:doc_id/store", post(documents::store))
        .route("/api/v1/search/semantic", post(search::semantic))
        .route("/api/v1/search/web", post(search::web))
        .route(
            "/api/v1/rag/answer-with-fallback",
            post(rag::answer_with_fallback),
        )
        .route("/api/v1/system/capabilities", get(system::capabilities))
        .route("/api/v1/system/llm-status", get(system::llm_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}
