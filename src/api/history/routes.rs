use crate::api::history::handlers::{history_handler, trend_handler};
use crate::api::models::AppState;
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/historico", get(history_handler))
        .route("/tendencia/{lat}/{lon}", get(trend_handler))
}
