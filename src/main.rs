//! roomly server entry point.
//!
//! Loads configuration, connects the store and serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use roomly::api;
use roomly::api::auth::JwtVerifier;
use roomly::app_state::AppState;
use roomly::config::{LogFormat, ServiceConfig, StoreBackend};
use roomly::domain::{BusinessCalendar, SystemClock};
use roomly::persistence::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.store_backend, "starting roomly");

    // Build persistence layer
    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(&config)
                .await
                .context("connecting to PostgreSQL")?;
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
                tracing::info!("migrations applied");
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::with_default_rules())
        }
    };

    // Build application state
    let calendar = BusinessCalendar::from_offset_minutes(config.business_utc_offset_minutes);
    let app_state = AppState::new(
        store,
        Arc::new(SystemClock),
        calendar,
        JwtVerifier::new(&config.jwt_secret),
    );

    // Build router
    let app = api::build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
