//! Fakes shared by the unit tests: an upstream air quality provider served
//! from a local port, and a mailer that records instead of sending.

use crate::alerts::AlertPolicy;
use crate::api::{self, AppState};
use crate::config::ProviderConfig;
use crate::notifier::{AlertEmail, Delivery, Mailer, Notifier, NotifyError};
use crate::provider::AirQualityClient;
use crate::storage::Repository;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

enum Reply {
    Json(Value),
    Status(u16),
}

struct FakeProviderState {
    reply: Reply,
    last_query: Option<(String, String, String)>,
}

pub struct FakeProvider {
    pub base_url: String,
    state: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(FakeProviderState {
            reply: Reply::Json(json!({ "list": [{ "main": { "aqi": 1 } }] })),
            last_query: None,
        }));

        let app = Router::new()
            .route("/data/2.5/air_pollution", get(air_pollution))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_aqi(&self, aqi: i64) {
        self.respond_with(json!({
            "coord": { "lon": 0.0, "lat": 0.0 },
            "list": [{ "main": { "aqi": aqi }, "components": { "pm2_5": 1.0 }, "dt": 1714550400 }]
        }));
    }

    pub fn respond_with(&self, body: Value) {
        self.state.lock().unwrap().reply = Reply::Json(body);
    }

    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().reply = Reply::Status(status);
    }

    /// `(lat, lon, appid)` of the most recent request.
    pub fn last_query(&self) -> Option<(String, String, String)> {
        self.state.lock().unwrap().last_query.clone()
    }
}

async fn air_pollution(
    State(state): State<Arc<Mutex<FakeProviderState>>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    let param = |key: &str| query.get(key).cloned().unwrap_or_default();
    state.last_query = Some((param("lat"), param("lon"), param("appid")));

    match &state.reply {
        Reply::Json(body) => Json(body.clone()).into_response(),
        Reply::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
    }
}

#[derive(Default)]
struct RecordingMailerInner {
    fail: bool,
    sent: Vec<AlertEmail>,
}

#[derive(Clone, Default)]
pub struct RecordingMailer(Arc<Mutex<RecordingMailerInner>>);

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.0.lock().unwrap().fail = true;
        mailer
    }

    pub fn sent(&self) -> Vec<AlertEmail> {
        self.0.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: AlertEmail) -> Result<Delivery, NotifyError> {
        let mut inner = self.0.lock().unwrap();
        if inner.fail {
            return Err(NotifyError::Message(lettre::error::Error::MissingTo));
        }
        inner.sent.push(email);
        Ok(Delivery::Sent)
    }
}

pub async fn test_state(provider_url: &str, mailer: RecordingMailer) -> AppState {
    let provider = ProviderConfig {
        base_url: provider_url.to_string(),
        api_key: Some("test-key".to_string()),
    };
    AppState {
        repository: Arc::new(Repository::in_memory().await.unwrap()),
        provider: Arc::new(AirQualityClient::new(reqwest::Client::new(), &provider)),
        notifier: Arc::new(Notifier::new(Arc::new(mailer))),
        policy: AlertPolicy::default(),
    }
}

pub async fn test_app(provider_url: &str, mailer: RecordingMailer) -> (Router, AppState) {
    let state = test_state(provider_url, mailer).await;
    (api::router(state.clone()), state)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
