mod alerts;
mod api;
mod classifier;
mod config;
mod notifier;
mod provider;
mod storage;
#[cfg(test)]
mod test_support;

use crate::alerts::AlertPolicy;
use crate::api::AppState;
use crate::config::AppConfig;
use crate::notifier::Notifier;
use crate::provider::AirQualityClient;
use crate::storage::Repository;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("🚀 Starting Air Quality Alert Server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Database: {}", config.database.path.display());
    info!("   - Provider: {}", config.provider.base_url);
    info!("   - Mail relay: {}:{} (tls: {})", config.mail.server, config.mail.port, config.mail.use_tls);
    info!(
        "   - Alerts: threshold {} / cooldown {}h",
        config.alerts.threshold, config.alerts.cooldown_hours
    );

    // Initialize storage
    info!("💾 Initializing database...");
    let repository = Arc::new(Repository::open(&config.database.path).await?);
    let record_count = repository.count_history().await?;
    info!("✅ Database ready ({} history records)", record_count);

    // Initialize outbound integrations
    let provider = Arc::new(AirQualityClient::new(reqwest::Client::new(), &config.provider));
    let mailer = notifier::mailer_from_config(&config.mail)?;
    let notifier = Arc::new(Notifier::new(mailer));
    info!("✅ Provider and notifier ready");

    // Create application state
    let state = AppState {
        repository,
        provider,
        notifier,
        policy: AlertPolicy::from(&config.alerts),
    };

    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   GET  /health                   - Health check");
    info!("   POST /registrar                - Subscribe to alerts");
    info!("   GET  /alerta-ar/{{lat}}/{{lon}}    - Current air quality");
    info!("   GET  /historico                - Reading history");
    info!("   GET  /tendencia/{{lat}}/{{lon}}    - Three-hour trend");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
