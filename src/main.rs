//! snippet-service server entry point.
//!
//! Loads configuration, opens the store and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use snippet_service::app_state::AppState;
use snippet_service::build_app;
use snippet_service::config::ServiceConfig;
use snippet_service::persistence::{MemoryStore, PostgresStore, SnippetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(addr = %config.listen_addr, "starting snippet-service");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using an insecure development secret");
    }

    // Build persistence layer
    let store: Arc<dyn SnippetStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("failed to initialize PostgreSQL store")?;
        tracing::info!("using PostgreSQL store");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled; data is kept in memory only");
        Arc::new(MemoryStore::new())
    };

    // Build application
    let app = build_app(AppState::new(&config, store));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
