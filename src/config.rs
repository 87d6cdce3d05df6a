use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application configuration, built once at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub mail: MailConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("historico.db"),
        }
    }
}

/// OpenWeatherMap air pollution API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.openweathermap.org".to_string(),
            api_key: None,
        }
    }
}

/// SMTP relay used for alert emails
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Defaults to `username` when unset.
    pub sender: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            use_tls: true,
            username: None,
            password: None,
            sender: None,
        }
    }
}

impl MailConfig {
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref().or(self.username.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum index that triggers an alert.
    pub threshold: i64,
    pub cooldown_hours: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: 1,
            cooldown_hours: 6,
        }
    }
}

impl AppConfig {
    /// Load `config.toml` (or `$AIR_ALERTS_CONFIG`) if present, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("AIR_ALERTS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            AppConfig::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        if config.provider.api_key.is_none() {
            warn!("API_KEY_OWM is not set, air quality requests will be rejected upstream");
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = var("API_KEY_OWM") {
            self.provider.api_key = Some(key);
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(port) = var("PORT") {
            self.server.port = port.parse().context("PORT must be a port number")?;
        }
        if let Some(server) = var("MAIL_SERVER") {
            self.mail.server = server;
        }
        if let Some(port) = var("MAIL_PORT") {
            self.mail.port = port.parse().context("MAIL_PORT must be a port number")?;
        }
        if let Some(flag) = var("MAIL_USE_TLS") {
            self.mail.use_tls = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(username) = var("MAIL_USERNAME") {
            self.mail.username = Some(username);
        }
        if let Some(password) = var("MAIL_PASSWORD") {
            self.mail.password = Some(password);
        }
        Ok(())
    }
}
