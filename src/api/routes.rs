use crate::api::{handlers, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Search
        .route("/v1/search", get(handlers::search))
        .route("/v1/search/suggestions", get(handlers::suggestions))
        .route("/v1/search/click", post(handlers::record_click))
        .route("/v1/search/history", get(handlers::search_history))
        // Analytics administration
        .route("/v1/admin/search/metrics", get(handlers::search_metrics))
        .route("/v1/admin/search/popular", get(handlers::popular_searches))
        .route("/v1/admin/search/performance", get(handlers::performance_stats))
        .route("/v1/admin/search/cleanup", post(handlers::cleanup))
        .route("/v1/admin/search/reindex", post(handlers::reindex))
        // Index maintenance, driven by the entity CRUD layer
        .route("/v1/index/:content_type", put(handlers::upsert_record))
        .route("/v1/index/:content_type/:id", delete(handlers::remove_record))
        // Prometheus
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
