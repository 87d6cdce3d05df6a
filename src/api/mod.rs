pub mod air_quality;
pub mod history;
pub mod models;
pub mod registration;

// Re-exports
pub use models::*;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

pub async fn health_handler(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let total_records = state.repository.count_history().await.unwrap_or(0);
    Json(models::HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        total_records,
    })
}

/// Full HTTP surface
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(registration::routes())
        .merge(air_quality::routes())
        .merge(history::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
