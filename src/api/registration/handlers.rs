use crate::api::models::*;
use crate::storage::Registration;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Rejected registration body");
        AppError::BadRequest(MISSING_FIELDS_MESSAGE.to_string())
    })?;

    // Validate
    let subscription = request.validate().map_err(AppError::BadRequest)?;

    let registration = state
        .repository
        .register_subscriber(
            &subscription.email,
            &subscription.latitude,
            &subscription.longitude,
        )
        .await
        .map_err(|e| AppError::Internal(format!("Ocorreu um erro: {}", e)))?;

    match registration {
        Registration::AlreadyRegistered => {
            info!(email = %subscription.email, "Email already registered");
            Ok((
                StatusCode::OK,
                Json(MessageResponse {
                    mensagem: "Este e-mail já está registrado.".to_string(),
                }),
            ))
        }
        Registration::Created(id) => {
            info!(
                id,
                email = %subscription.email,
                lat = %subscription.latitude,
                lon = %subscription.longitude,
                "Subscriber registered"
            );
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    mensagem: "Usuário registrado com sucesso para receber alertas!".to_string(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{json_body, test_app, RecordingMailer};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn register(body: Value) -> Request<Body> {
        Request::post("/registrar")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn second_registration_is_a_noop() {
        let (app, state) = test_app("http://127.0.0.1:9", RecordingMailer::new()).await;
        let body = json!({"email": "a@example.com", "latitude": "-23.55", "longitude": "-46.63"});

        let first = app.clone().oneshot(register(body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(first).await["mensagem"],
            "Usuário registrado com sucesso para receber alertas!"
        );

        let second = app.oneshot(register(body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json_body(second).await["mensagem"], "Este e-mail já está registrado.");

        assert_eq!(state.repository.count_subscribers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (app, state) = test_app("http://127.0.0.1:9", RecordingMailer::new()).await;

        for body in [
            json!({"latitude": "1", "longitude": "2"}),
            json!({"email": "a@example.com", "longitude": "2"}),
            json!({"email": "a@example.com", "latitude": "1"}),
        ] {
            let response = app.clone().oneshot(register(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await["erro"],
                "Dados incompletos (email, latitude, longitude são obrigatórios)"
            );
        }
        assert_eq!(state.repository.count_subscribers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_a_client_error() {
        let (app, _) = test_app("http://127.0.0.1:9", RecordingMailer::new()).await;
        let request = Request::post("/registrar")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
