use crate::api::models::AppState;
use crate::api::registration::handlers::register_handler;
use axum::{routing::post, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/registrar", post(register_handler))
}
