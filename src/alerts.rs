use chrono::{DateTime, Duration, Utc};

use crate::config::AlertConfig;

/// Fixed look-back window for trend analysis, in hours
pub const TREND_WINDOW_HOURS: i64 = 3;

/// When a subscriber should be alerted
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    pub threshold: i64,
    pub cooldown: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

impl From<&AlertConfig> for AlertPolicy {
    fn from(config: &AlertConfig) -> Self {
        Self {
            threshold: config.threshold,
            cooldown: Duration::hours(config.cooldown_hours),
        }
    }
}

impl AlertPolicy {
    /// Never alerted, or the cooldown has fully elapsed.
    pub fn is_due(&self, aqi: i64, last_alert: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if aqi < self.threshold {
            return false;
        }
        match last_alert {
            None => true,
            Some(last) => now - last > self.cooldown,
        }
    }
}

/// Direction of air quality over the trend window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Worsening,
    Improving,
    Stable,
    InsufficientData,
}

impl Trend {
    /// Compares the first and last index of an oldest-first window.
    pub fn from_window(indices: &[i64]) -> Self {
        match indices {
            [first, .., last] if last > first => Trend::Worsening,
            [first, .., last] if last < first => Trend::Improving,
            [_, .., _] => Trend::Stable,
            _ => Trend::InsufficientData,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Worsening => "Piorando",
            Trend::Improving => "Melhorando",
            Trend::Stable => "Estável",
            Trend::InsufficientData => "Dados insuficientes para análise",
        }
    }
}
