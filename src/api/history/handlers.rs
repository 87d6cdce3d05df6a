use crate::alerts::{Trend, TREND_WINDOW_HOURS};
use crate::api::models::*;
use crate::storage::StorageError;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

pub async fn history_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let records = state.repository.list_history().await.map_err(|e| {
        AppError::Internal(format!("Ocorreu um erro ao consultar o histórico: {}", e))
    })?;

    info!(count = records.len(), "History listed");

    Ok(Json(records.into_iter().map(HistoryEntry::from).collect()))
}

pub async fn trend_handler(
    State(state): State<AppState>,
    Path((lat, lon)): Path<(String, String)>,
) -> Result<Json<TrendResponse>, AppError> {
    analyze_trend(&state, lat, lon, Utc::now())
        .await
        .map(Json)
        .map_err(|e| AppError::Internal(format!("Ocorreu um erro ao analisar a tendência: {}", e)))
}

/// Trend of readings at this exact coordinate over the last few hours.
pub async fn analyze_trend(
    state: &AppState,
    lat: String,
    lon: String,
    now: DateTime<Utc>,
) -> Result<TrendResponse, StorageError> {
    let since = now - Duration::hours(TREND_WINDOW_HOURS);
    let indices = state
        .repository
        .history_indices_since(&lat, &lon, since)
        .await?;
    let trend = Trend::from_window(&indices);

    info!(%lat, %lon, records = indices.len(), trend = trend.label(), "Trend analyzed");

    Ok(TrendResponse {
        coordenadas: Coordinates {
            latitude: lat,
            longitude: lon,
        },
        periodo_analisado_horas: TREND_WINDOW_HOURS,
        registros_encontrados: indices.len(),
        tendencia_qualidade_ar: trend.label().to_string(),
    })
}
