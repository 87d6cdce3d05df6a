use crate::api::air_quality::handlers::air_quality_handler;
use crate::api::models::AppState;
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerta-ar/{lat}/{lon}", get(air_quality_handler))
}
