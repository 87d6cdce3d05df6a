use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderConfig;

const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to air quality provider failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("air quality provider answered {0}")]
    Status(StatusCode),
    #[error("malformed air quality payload: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("air quality provider returned no measurements")]
    EmptyMeasurements,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    main: MeasurementIndex,
}

#[derive(Debug, Deserialize)]
struct MeasurementIndex {
    aqi: i64,
}

/// Client for the OpenWeatherMap air pollution endpoint
pub struct AirQualityClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AirQualityClient {
    pub fn new(http: Client, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    /// Current index at the coordinate; coordinates are passed through as given.
    pub async fn current_index(&self, latitude: &str, longitude: &str) -> Result<i64, ProviderError> {
        let url = format!("{}{}", self.base_url, AIR_POLLUTION_PATH);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", latitude),
                ("lon", longitude),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(ProviderError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let payload: AirPollutionResponse =
            response.json().await.map_err(ProviderError::Malformed)?;
        let aqi = payload
            .list
            .first()
            .map(|m| m.main.aqi)
            .ok_or(ProviderError::EmptyMeasurements)?;

        debug!(latitude, longitude, aqi, "Fetched air quality index");
        Ok(aqi)
    }
}
