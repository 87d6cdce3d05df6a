use crate::api::models::*;
use crate::classifier::Classification;
use crate::provider::ProviderError;
use crate::storage::{NewHistoryRecord, StorageError};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

const REALTIME_NOTICE: &str = "Dados em tempo real. Registro salvo no histórico.";

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub async fn air_quality_handler(
    State(state): State<AppState>,
    Path((lat, lon)): Path<(String, String)>,
) -> Result<Json<AirQualityResponse>, AppError> {
    check_air_quality(&state, &lat, &lon, Utc::now())
        .await
        .map(Json)
        .map_err(|e| AppError::Internal(format!("Ocorreu um erro: {}", e)))
}

/// Fetch, classify, record and alert. Any failure before the response fails the whole call.
pub async fn check_air_quality(
    state: &AppState,
    lat: &str,
    lon: &str,
    now: DateTime<Utc>,
) -> Result<AirQualityResponse, CheckError> {
    let aqi = state.provider.current_index(lat, lon).await?;
    let classification = Classification::new(aqi);

    info!(lat, lon, aqi, risk = classification.label(), "Air quality fetched");

    state
        .repository
        .insert_history(NewHistoryRecord {
            timestamp: now,
            latitude: lat.to_string(),
            longitude: lon.to_string(),
            aqi,
            risk: classification.label().to_string(),
        })
        .await?;

    if aqi >= state.policy.threshold {
        notify_subscribers(state, &classification, lat, lon, now).await?;
    }

    Ok(AirQualityResponse {
        indice_qualidade_ar: aqi,
        risco: classification.label().to_string(),
        recomendacao: classification.recommendation().to_string(),
        aviso: REALTIME_NOTICE.to_string(),
    })
}

/// Alert every due subscriber at this exact coordinate, committing each one separately.
async fn notify_subscribers(
    state: &AppState,
    classification: &Classification,
    lat: &str,
    lon: &str,
    now: DateTime<Utc>,
) -> Result<(), StorageError> {
    let subscribers = state.repository.subscribers_at(lat, lon).await?;

    for subscriber in subscribers {
        if !state
            .policy
            .is_due(classification.aqi, subscriber.last_alert, now)
        {
            continue;
        }

        if let Err(e) = state
            .notifier
            .send_alert(&subscriber.email, classification, lat, lon)
            .await
        {
            warn!(to = %subscriber.email, error = %e, "Alert email not delivered");
        }

        state.repository.record_alert(subscriber.id, now).await?;
    }

    Ok(())
}
