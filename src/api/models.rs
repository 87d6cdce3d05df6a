use crate::alerts::AlertPolicy;
use crate::notifier::Notifier;
use crate::provider::AirQualityClient;
use crate::storage::{HistoryRecord, Repository};
use crate::storage::sqlite::encode_timestamp;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub const MISSING_FIELDS_MESSAGE: &str =
    "Dados incompletos (email, latitude, longitude são obrigatórios)";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub provider: Arc<AirQualityClient>,
    pub notifier: Arc<Notifier>,
    pub policy: AlertPolicy,
}

/// Request to subscribe an email to alerts at a coordinate
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

/// A validated registration
#[derive(Debug, PartialEq, Eq)]
pub struct NewSubscription {
    pub email: String,
    pub latitude: String,
    pub longitude: String,
}

impl RegisterRequest {
    /// Validate the request; coordinates may arrive as JSON strings or numbers.
    pub fn validate(self) -> Result<NewSubscription, String> {
        let email = self.email.filter(|e| !e.is_empty());
        let latitude = self.latitude.as_ref().and_then(coordinate_text);
        let longitude = self.longitude.as_ref().and_then(coordinate_text);

        match (email, latitude, longitude) {
            (Some(email), Some(latitude), Some(longitude)) => Ok(NewSubscription {
                email,
                latitude,
                longitude,
            }),
            _ => Err(MISSING_FIELDS_MESSAGE.to_string()),
        }
    }
}

fn coordinate_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub mensagem: String,
}

/// Current conditions at a coordinate
#[derive(Debug, Serialize)]
pub struct AirQualityResponse {
    pub indice_qualidade_ar: i64,
    pub risco: String,
    pub recomendacao: String,
    pub aviso: String,
}

/// One history row as served
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: String,
    pub latitude: String,
    pub longitude: String,
    pub indice_aqi: i64,
    pub risco: String,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id,
            timestamp: encode_timestamp(record.timestamp),
            latitude: record.latitude,
            longitude: record.longitude,
            indice_aqi: record.aqi,
            risco: record.risk,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

/// Trend over the fixed analysis window
#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub coordenadas: Coordinates,
    pub periodo_analisado_horas: i64,
    pub registros_encontrados: usize,
    pub tendencia_qualidade_ar: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub total_records: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub erro: String,
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { erro: message })).into_response()
    }
}
